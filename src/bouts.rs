// Run-length encoding of an occupancy mask into bouts.
// A bout is a maximal run of `true` frames; bouts come out sorted and disjoint.

use crate::types::Bout;

/// Converts occupancy masks into bouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoutExtractor;

impl BoutExtractor {
    pub fn new() -> Self {
        BoutExtractor
    }

    /// Single pass over the mask. An all-false mask yields no bouts.
    pub fn extract(&self, mask: &[bool]) -> Vec<Bout> {
        let mut bouts = Vec::new();
        let mut run_start: Option<usize> = None;

        for (frame, &inside) in mask.iter().enumerate() {
            match (inside, run_start) {
                (true, None) => run_start = Some(frame),
                (false, Some(start)) => {
                    bouts.push(Bout::new(start, frame - 1));
                    run_start = None;
                }
                _ => {}
            }
        }

        if let Some(start) = run_start {
            bouts.push(Bout::new(start, mask.len() - 1));
        }

        bouts
    }
}
