use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_MAX_ITERS;
use crate::error::{Result, StrataError};
use crate::stack::sigma_clip::SigmaClipParams;

/// Complete description of one stacking run, populated by any front end
/// (CLI flags, TOML file, or a library caller) before the pipeline is
/// invoked. The core never reads interactive state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    /// Folder scanned for `.tif` inputs; outputs land here too.
    pub folder: PathBuf,
    /// Values strictly above this become missing. `None` skips masking.
    #[serde(default)]
    pub threshold: Option<f32>,
    /// Emit the plain mean aggregate.
    #[serde(default)]
    pub mean_stacking: bool,
    /// Emit the sigma-clipped aggregate.
    #[serde(default)]
    pub sigma_stacking: bool,
    /// Sigma multiplier; required when `sigma_stacking` is set.
    #[serde(default)]
    pub sigma: Option<f32>,
    /// Iteration budget for sigma clipping.
    #[serde(default = "default_max_iters")]
    pub max_iters: usize,
}

fn default_max_iters() -> usize {
    DEFAULT_MAX_ITERS
}

impl JobConfig {
    /// Check parameter consistency before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if !self.mean_stacking && !self.sigma_stacking {
            return Err(StrataError::Config(
                "at least one of mean_stacking / sigma_stacking must be enabled".into(),
            ));
        }
        if self.sigma_stacking {
            match self.sigma {
                None => {
                    return Err(StrataError::Config(
                        "sigma_stacking requires a sigma value".into(),
                    ))
                }
                Some(s) if !(s > 0.0) => {
                    return Err(StrataError::Config(format!(
                        "sigma must be positive, got {s}"
                    )))
                }
                _ => {}
            }
            if self.max_iters == 0 {
                return Err(StrataError::Config("max_iters must be at least 1".into()));
            }
        }
        Ok(())
    }

    /// Sigma-clip parameters, when sigma stacking is configured.
    pub fn sigma_params(&self) -> Option<SigmaClipParams> {
        if !self.sigma_stacking {
            return None;
        }
        self.sigma.map(|sigma| SigmaClipParams {
            sigma,
            max_iters: self.max_iters,
        })
    }
}
