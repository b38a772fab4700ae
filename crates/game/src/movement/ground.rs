use glam::Vec2;

/// Height of the walkable surface under a ground-plane point, if any.
pub trait GroundHeight {
    fn height_at(&self, x: f32, z: f32) -> Option<f32>;
}

impl<F> GroundHeight for F
where
    F: Fn(f32, f32) -> Option<f32>,
{
    fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self(x, z)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround {
    pub height: f32,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl GroundHeight for FlatGround {
    fn height_at(&self, _x: f32, _z: f32) -> Option<f32> {
        Some(self.height)
    }
}

/// Regular grid of height samples, bilinearly interpolated. Points outside
/// the grid have no ground.
#[derive(Debug, Clone)]
pub struct HeightField {
    origin: Vec2,
    cell_size: f32,
    columns: usize,
    rows: usize,
    heights: Vec<f32>,
}

impl HeightField {
    /// `heights` is row-major, `rows` rows of `columns` samples, row index
    /// along +z.
    pub fn new(origin: Vec2, cell_size: f32, columns: usize, heights: Vec<f32>) -> Option<Self> {
        if columns < 2 || cell_size <= 0.0 || heights.len() % columns != 0 {
            return None;
        }
        let rows = heights.len() / columns;
        if rows < 2 {
            return None;
        }
        Some(Self {
            origin,
            cell_size,
            columns,
            rows,
            heights,
        })
    }

    fn sample(&self, column: usize, row: usize) -> f32 {
        self.heights[row * self.columns + column]
    }
}

impl GroundHeight for HeightField {
    fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let gx = (x - self.origin.x) / self.cell_size;
        let gz = (z - self.origin.y) / self.cell_size;
        let max_x = (self.columns - 1) as f32;
        let max_z = (self.rows - 1) as f32;
        if !(0.0..=max_x).contains(&gx) || !(0.0..=max_z).contains(&gz) {
            return None;
        }

        let c0 = (gx.floor() as usize).min(self.columns - 2);
        let r0 = (gz.floor() as usize).min(self.rows - 2);
        let tx = gx - c0 as f32;
        let tz = gz - r0 as f32;

        let near = self.sample(c0, r0) + (self.sample(c0 + 1, r0) - self.sample(c0, r0)) * tx;
        let far =
            self.sample(c0, r0 + 1) + (self.sample(c0 + 1, r0 + 1) - self.sample(c0, r0 + 1)) * tx;
        Some(near + (far - near) * tz)
    }
}
