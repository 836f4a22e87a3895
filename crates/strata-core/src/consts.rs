/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Default sigma multiplier for sigma-clipped stacking.
pub const DEFAULT_SIGMA: f32 = 3.0;

/// Default iteration budget for sigma-clipped stacking.
pub const DEFAULT_MAX_ITERS: usize = 5;

/// Output filename for the plain mean aggregate.
pub const OUTPUT_MEAN_FILENAME: &str = "output_mean.tif";

/// Output filename for the sigma-clipped aggregate.
pub const OUTPUT_SIGMA_FILENAME: &str = "output_sigma_clipped.tif";

/// Output filename for the comparison preview.
pub const OUTPUT_PLOT_FILENAME: &str = "output_plot.png";
