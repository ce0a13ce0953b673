//! Keyframe index schedules for forward, reverse and fast playback.

/// Playback direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// Sequence of keyframe indices to visit.
///
/// ```ignore
/// // Reverse at 3x speed, skipping two keyframes per step.
/// for index in Playback::reverse(player.get_num_keyframes()).with_speed(3) {
///     player.set_keyframe_index(index as i64, &mut scene)?;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playback {
    len: usize,
    direction: Direction,
    speed: usize,
    start: Option<usize>,
}

impl Playback {
    /// Every keyframe from first to last.
    pub fn forward(len: usize) -> Self {
        Self {
            len,
            direction: Direction::Forward,
            speed: 1,
            start: None,
        }
    }

    /// Every keyframe from last to first.
    pub fn reverse(len: usize) -> Self {
        Self {
            direction: Direction::Reverse,
            ..Self::forward(len)
        }
    }

    /// Advance `speed` keyframes per step (0 is treated as 1).
    pub fn with_speed(mut self, speed: usize) -> Self {
        self.speed = speed.max(1);
        self
    }

    /// Begin at `index` instead of the first (or, in reverse, last) keyframe.
    /// An index past the end yields nothing.
    pub fn starting_at(mut self, index: usize) -> Self {
        self.start = Some(index);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl IntoIterator for Playback {
    type Item = usize;
    type IntoIter = PlaybackIter;

    fn into_iter(self) -> PlaybackIter {
        let start = match self.direction {
            Direction::Forward => self.start.unwrap_or(0),
            Direction::Reverse => self.start.unwrap_or(self.len.saturating_sub(1)),
        };
        let remaining = if start >= self.len {
            0
        } else {
            match self.direction {
                Direction::Forward => (self.len - 1 - start) / self.speed + 1,
                Direction::Reverse => start / self.speed + 1,
            }
        };
        PlaybackIter {
            next: start,
            remaining,
            step: self.speed,
            direction: self.direction,
        }
    }
}

/// Iterator over a [`Playback`] schedule.
#[derive(Debug, Clone)]
pub struct PlaybackIter {
    next: usize,
    remaining: usize,
    step: usize,
    direction: Direction,
}

impl Iterator for PlaybackIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }

        let current = self.next;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.next = match self.direction {
                Direction::Forward => current + self.step,
                Direction::Reverse => current - self.step,
            };
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for PlaybackIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward() {
        let indices: Vec<_> = Playback::forward(4).into_iter().collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reverse_fast() {
        let indices: Vec<_> = Playback::reverse(10)
            .starting_at(8)
            .with_speed(3)
            .into_iter()
            .collect();
        assert_eq!(indices, vec![8, 5, 2]);

        let indices: Vec<_> = Playback::reverse(10).with_speed(3).into_iter().collect();
        assert_eq!(indices, vec![9, 6, 3, 0]);
    }

    #[test]
    fn test_exact_size() {
        let iter = Playback::forward(10).with_speed(4).into_iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.collect::<Vec<_>>(), vec![0, 4, 8]);
    }

    #[test]
    fn test_empty_and_out_of_range() {
        assert_eq!(Playback::forward(0).into_iter().len(), 0);
        assert_eq!(Playback::reverse(0).into_iter().len(), 0);
        assert_eq!(Playback::forward(5).starting_at(5).into_iter().len(), 0);
        assert_eq!(Playback::reverse(5).starting_at(9).into_iter().len(), 0);
    }

    #[test]
    fn test_zero_speed() {
        let indices: Vec<_> = Playback::forward(3).with_speed(0).into_iter().collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
