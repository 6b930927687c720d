// Pose bookkeeping for one degree of freedom.
//
// Every joint tracks the same triplet: an absolute pose that follows the
// raw sensor from the moment the subsystem was built, a reference offset,
// and the visible pose the rest of the robot reads. Taring rewrites only
// the offset, so the visible value jumps to the target with no transient
// in the underlying sensor track.

use std::ops::{Add, Sub};

/// Reference/absolute/visible pose triplet.
///
/// Invariant: `visible == absolute + reference_offset` after every update
/// and every tare.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseStore<T> {
    reference_offset: T,
    absolute: T,
    visible: T,
}

impl<T> PoseStore<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T>,
{
    /// New store with all three values at `zero`
    pub fn new(zero: T) -> Self {
        Self {
            reference_offset: zero,
            absolute: zero,
            visible: zero,
        }
    }

    /// Recompute from a raw sensor sample (already scaled to pose units)
    pub fn update(&mut self, raw_absolute: T) {
        self.absolute = raw_absolute;
        self.visible = self.absolute + self.reference_offset;
    }

    /// Re-zero the visible pose to `target` without touching the sensor track
    pub fn tare(&mut self, target: T) {
        self.reference_offset = target - self.absolute;
        self.visible = target;
    }

    /// Current visible pose
    pub fn get(&self) -> T {
        self.visible
    }

    /// Sensor-track pose, unaffected by taring
    pub fn absolute(&self) -> T {
        self.absolute
    }

    pub fn reference_offset(&self) -> T {
        self.reference_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_tracks_raw() {
        let mut pose = PoseStore::new(0.0);
        pose.update(12.5);
        assert_eq!(pose.get(), 12.5);
        assert_eq!(pose.absolute(), 12.5);
    }

    #[test]
    fn test_tare_is_immediate_and_offset_is_exact() {
        let mut pose = PoseStore::new(0.0);
        pose.update(30.0);
        pose.tare(90.0);

        assert_eq!(pose.get(), 90.0);
        assert_eq!(pose.reference_offset(), 90.0 - 30.0);
        // The sensor track itself is untouched
        assert_eq!(pose.absolute(), 30.0);
    }

    #[test]
    fn test_invariant_holds_across_mixed_sequences() {
        let mut pose = PoseStore::new(0.0);
        let script: [(bool, f64); 7] = [
            (true, 5.0),
            (true, 7.5),
            (false, 0.0),
            (true, 9.0),
            (false, -45.0),
            (true, 10.0),
            (true, 3.0),
        ];

        for (is_update, value) in script {
            if is_update {
                pose.update(value);
            } else {
                pose.tare(value);
            }
            assert_eq!(pose.get(), pose.absolute() + pose.reference_offset());
        }
    }

    #[test]
    fn test_update_after_tare_keeps_offset() {
        let mut pose = PoseStore::new(0.0);
        pose.update(10.0);
        pose.tare(0.0);
        // Joint moves 4 degrees after the tare
        pose.update(14.0);
        assert_eq!(pose.get(), 4.0);
    }
}
