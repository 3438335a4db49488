use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lower_left: [f64; 2],
    pub upper_right: [f64; 2],
    pub center: [f64; 2],
    pub width: [f64; 2],
}

impl BoundingBox {
    pub fn new(lower_left: [f64; 2], upper_right: [f64; 2]) -> Self {
        let center = [
            0.5 * (lower_left[0] + upper_right[0]),
            0.5 * (lower_left[1] + upper_right[1]),
        ];
        let width = [upper_right[0] - lower_left[0], upper_right[1] - lower_left[1]];
        BoundingBox {
            lower_left,
            upper_right,
            center,
            width,
        }
    }

    /// Box with inverted infinite corners; growing it with any extent yields that extent.
    pub fn empty() -> Self {
        BoundingBox::new([f64::INFINITY; 2], [f64::NEG_INFINITY; 2])
    }

    pub fn is_finite(&self) -> bool {
        self.lower_left.iter().chain(self.upper_right.iter()).all(|v| v.is_finite())
    }

    /// Widen the box along `axis` to cover [min, max].
    pub fn grow(&mut self, axis: usize, min: f64, max: f64) {
        self.lower_left[axis] = self.lower_left[axis].min(min);
        self.upper_right[axis] = self.upper_right[axis].max(max);
        *self = BoundingBox::new(self.lower_left, self.upper_right);
    }
}
