use console::Style;
use strata_core::pipeline::config::JobConfig;
use strata_core::pipeline::JobOutput;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    enabled: Style,
    disabled: Style,
    warn: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            enabled: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            warn: Style::new().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_job_summary(config: &JobConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Strata"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Folder"),
        s.path.apply_to(config.folder.display())
    );
    match config.threshold {
        Some(t) => println!(
            "  {:<14}{}",
            s.label.apply_to("Threshold"),
            s.value.apply_to(t)
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Threshold"),
            s.disabled.apply_to("off")
        ),
    }
    if config.mean_stacking {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Mean"),
            s.enabled.apply_to("enabled")
        );
    }
    if config.sigma_stacking {
        println!(
            "  {:<14}{} (sigma {}, max {} iters)",
            s.label.apply_to("Sigma clip"),
            s.enabled.apply_to("enabled"),
            config.sigma.unwrap_or_default(),
            config.max_iters
        );
    }
    println!();
}

pub fn print_job_result(output: &JobOutput) {
    let s = Styles::new();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Stacked"),
        s.value.apply_to(format!("{} tiles", output.observations))
    );
    for skip in &output.skipped {
        println!("  {}", s.warn.apply_to(skip));
    }
    for path in &output.written {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Written"),
            s.path.apply_to(path.display())
        );
    }
    println!();
}
