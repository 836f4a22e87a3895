use ndarray::Array3;

use crate::error::{Result, StrataError};
use crate::stack::build::Stack;
use crate::tile::Aggregate;

/// Aggregate a stack by the arithmetic mean of the valid observations at
/// each (band, row, col). Coordinates with no valid observation come out
/// missing. No clipping, no iteration.
pub fn mean_stack(stack: &Stack) -> Result<Aggregate> {
    let (n, b, h, w) = stack.values.dim();
    if n == 0 {
        return Err(StrataError::EmptyStack);
    }

    let mut values = Array3::<f32>::zeros((b, h, w));
    let mut valid = Array3::<bool>::from_elem((b, h, w), false);

    for band in 0..b {
        for row in 0..h {
            for col in 0..w {
                // f64 accumulation; f32 sums drift on deep stacks
                let mut sum = 0.0f64;
                let mut count = 0u32;
                for obs in 0..n {
                    if stack.valid[[obs, band, row, col]] {
                        sum += stack.values[[obs, band, row, col]] as f64;
                        count += 1;
                    }
                }
                if count > 0 {
                    values[[band, row, col]] = (sum / count as f64) as f32;
                    valid[[band, row, col]] = true;
                }
            }
        }
    }

    Ok(Aggregate { values, valid })
}
