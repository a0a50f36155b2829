//! Grid state store
//!
//! Per-cell simulation state lives in three double-buffered fields:
//!
//! - **Height**: bedrock `B`, water depth `D`, suspended sediment `S` (plus one
//!   reserved channel so the cell packs into a `vec4<f32>` on the GPU)
//! - **Flux**: outgoing flow through the four virtual pipes
//! - **Velocity**: horizontal water velocity `(vx, vy)`
//!
//! Each field is a [`PingPong`] pair: one committed generation that stages read
//! from, one write generation a stage fills completely. Committing swaps the two,
//! so the next stage observes exactly the previous stage's output.

use crate::error::ErosionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Edge length of a compute tile; grid widths must be a multiple of it
pub const WORKGROUP_SIZE: usize = 16;

/// Largest accepted grid width (4096² cells, about 1.3 GB of state)
pub const MAX_GRID_WIDTH: usize = 4096;

/// Terrain, water and sediment for one cell
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "gpu", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct HeightCell {
    /// Bedrock height `B`
    pub bedrock: f32,
    /// Water depth `D` (≥ 0)
    pub water: f32,
    /// Suspended sediment `S` (≥ 0)
    pub sediment: f32,
    /// Unused, keeps the cell 16 bytes wide
    pub reserved: f32,
}

impl HeightCell {
    /// Dry cell with the given bedrock height
    #[must_use]
    pub const fn dry(bedrock: f32) -> Self {
        Self {
            bedrock,
            water: 0.0,
            sediment: 0.0,
            reserved: 0.0,
        }
    }

    /// Water surface elevation `B + D`
    #[inline]
    #[must_use]
    pub fn surface(&self) -> f32 {
        self.bedrock + self.water
    }
}

/// Outgoing flux through the four pipes of a cell
///
/// `top` points towards `y - 1`, `bottom` towards `y + 1`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "gpu", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct FluxCell {
    /// Flow towards `x - 1`
    pub left: f32,
    /// Flow towards `x + 1`
    pub right: f32,
    /// Flow towards `y - 1`
    pub top: f32,
    /// Flow towards `y + 1`
    pub bottom: f32,
}

impl FluxCell {
    /// Sum of all four outgoing flows
    #[inline]
    #[must_use]
    pub fn total(&self) -> f32 {
        self.left + self.right + self.top + self.bottom
    }
}

/// Horizontal water velocity of a cell
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "gpu", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct VelocityCell {
    /// Velocity along +x
    pub vx: f32,
    /// Velocity along +y
    pub vy: f32,
}

impl VelocityCell {
    /// Speed `|v|`
    #[inline]
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.vx.hypot(self.vy)
    }
}

/// Identifies one of the double-buffered fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferId {
    /// Bedrock, water, sediment
    Height,
    /// Outgoing pipe flux
    Flux,
    /// Water velocity
    Velocity,
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Height => "height",
            Self::Flux => "flux",
            Self::Velocity => "velocity",
        })
    }
}

/// Two fixed generations of one field plus the index of the committed one
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [Vec<T>; 2],
    current: usize,
}

impl<T: Copy> PingPong<T> {
    /// Both generations filled with `value`
    #[must_use]
    pub fn filled(len: usize, value: T) -> Self {
        Self {
            slots: [vec![value; len], vec![value; len]],
            current: 0,
        }
    }

    /// Both generations initialized from `data`
    #[must_use]
    pub fn from_slice(data: &[T]) -> Self {
        Self {
            slots: [data.to_vec(), data.to_vec()],
            current: 0,
        }
    }

    /// Committed generation
    #[must_use]
    pub fn read(&self) -> &[T] {
        &self.slots[self.current]
    }

    /// Generation the next writer fills
    pub fn write_target(&mut self) -> &mut [T] {
        &mut self.slots[self.current ^ 1]
    }

    /// Committed generation and write target at once
    pub fn split(&mut self) -> (&[T], &mut [T]) {
        let [first, second] = &mut self.slots;
        if self.current == 0 {
            (first.as_slice(), second.as_mut_slice())
        } else {
            (second.as_slice(), first.as_mut_slice())
        }
    }

    /// Make the write target the committed generation
    pub fn commit(&mut self) {
        self.current ^= 1;
    }

    /// Index of the committed slot (0 or 1)
    #[must_use]
    pub fn generation(&self) -> usize {
        self.current
    }

    /// Overwrite both generations
    pub fn reset(&mut self, data: &[T]) {
        for slot in &mut self.slots {
            slot.copy_from_slice(data);
        }
    }

    /// Set every cell of both generations to `value`
    pub fn fill(&mut self, value: T) {
        for slot in &mut self.slots {
            slot.fill(value);
        }
    }
}

/// All three double-buffered fields of an initialized grid
#[derive(Debug, Clone)]
pub struct Generations {
    /// Bedrock, water, sediment
    pub height: PingPong<HeightCell>,
    /// Outgoing pipe flux
    pub flux: PingPong<FluxCell>,
    /// Water velocity
    pub velocity: PingPong<VelocityCell>,
}

/// Owner of every simulation buffer for a W×W grid
///
/// A store is created empty; [`seed`](Self::seed) allocates and initializes the
/// buffers. Reads, writes and commits before that fail with
/// [`ErosionError::BufferNotReady`].
#[derive(Debug, Clone)]
pub struct GridStore {
    width: usize,
    state: Option<Generations>,
}

impl GridStore {
    /// Create an uninitialized store
    ///
    /// # Errors
    ///
    /// [`ErosionError::InvalidGridSize`] if `width` is zero or not a multiple
    /// of [`WORKGROUP_SIZE`].
    pub fn new(width: usize) -> Result<Self, ErosionError> {
        validate_grid_width(width)?;
        Ok(Self { width, state: None })
    }

    /// Grid width (and height) in cells
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.width * self.width
    }

    /// Always false: a valid grid has at least one tile
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`seed`](Self::seed) has run
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// Initialize from a bedrock heightfield; water, sediment, flux and velocity start at zero
    ///
    /// Can be called again to replace the terrain.
    ///
    /// # Errors
    ///
    /// [`ErosionError::HeightfieldMismatch`] if `bedrock` does not have W×W samples.
    pub fn seed(&mut self, bedrock: &[f32]) -> Result<(), ErosionError> {
        let expected = self.len();
        if bedrock.len() != expected {
            return Err(ErosionError::HeightfieldMismatch {
                expected,
                actual: bedrock.len(),
            });
        }
        let cells: Vec<HeightCell> = bedrock.iter().copied().map(HeightCell::dry).collect();
        self.state = Some(Generations {
            height: PingPong::from_slice(&cells),
            flux: PingPong::filled(expected, FluxCell::default()),
            velocity: PingPong::filled(expected, VelocityCell::default()),
        });
        Ok(())
    }

    /// Replace the committed height generation wholesale
    ///
    /// # Errors
    ///
    /// [`ErosionError::BufferNotReady`] before seeding,
    /// [`ErosionError::HeightfieldMismatch`] on a length mismatch.
    pub fn write_height(&mut self, cells: &[HeightCell]) -> Result<(), ErosionError> {
        let expected = self.len();
        let state = self.generations_mut(BufferId::Height)?;
        if cells.len() != expected {
            return Err(ErosionError::HeightfieldMismatch {
                expected,
                actual: cells.len(),
            });
        }
        state.height.reset(cells);
        Ok(())
    }

    /// Committed height generation
    ///
    /// # Errors
    ///
    /// [`ErosionError::BufferNotReady`] before seeding.
    pub fn height(&self) -> Result<&[HeightCell], ErosionError> {
        Ok(self.generations(BufferId::Height)?.height.read())
    }

    /// Committed flux generation
    ///
    /// # Errors
    ///
    /// [`ErosionError::BufferNotReady`] before seeding.
    pub fn flux(&self) -> Result<&[FluxCell], ErosionError> {
        Ok(self.generations(BufferId::Flux)?.flux.read())
    }

    /// Committed velocity generation
    ///
    /// # Errors
    ///
    /// [`ErosionError::BufferNotReady`] before seeding.
    pub fn velocity(&self) -> Result<&[VelocityCell], ErosionError> {
        Ok(self.generations(BufferId::Velocity)?.velocity.read())
    }

    /// Borrow every field, naming `buffer` in the error if the store is empty
    ///
    /// # Errors
    ///
    /// [`ErosionError::BufferNotReady`] before seeding.
    pub fn generations(&self, buffer: BufferId) -> Result<&Generations, ErosionError> {
        self.state
            .as_ref()
            .ok_or(ErosionError::BufferNotReady { buffer })
    }

    /// Mutably borrow every field for a stage
    ///
    /// # Errors
    ///
    /// [`ErosionError::BufferNotReady`] before seeding.
    pub fn generations_mut(&mut self, buffer: BufferId) -> Result<&mut Generations, ErosionError> {
        self.state
            .as_mut()
            .ok_or(ErosionError::BufferNotReady { buffer })
    }

    /// Swap the generations of one field
    ///
    /// # Errors
    ///
    /// [`ErosionError::BufferNotReady`] before seeding.
    pub fn commit(&mut self, buffer: BufferId) -> Result<(), ErosionError> {
        let state = self.generations_mut(buffer)?;
        match buffer {
            BufferId::Height => state.height.commit(),
            BufferId::Flux => state.flux.commit(),
            BufferId::Velocity => state.velocity.commit(),
        }
        Ok(())
    }
}

/// Check that a grid width tiles evenly into compute workgroups
///
/// # Errors
///
/// [`ErosionError::InvalidGridSize`] if `width` is zero, not a multiple of
/// [`WORKGROUP_SIZE`] or larger than [`MAX_GRID_WIDTH`].
pub fn validate_grid_width(width: usize) -> Result<(), ErosionError> {
    if width == 0 || width % WORKGROUP_SIZE != 0 || width > MAX_GRID_WIDTH {
        return Err(ErosionError::InvalidGridSize {
            width,
            tile: WORKGROUP_SIZE,
            max: MAX_GRID_WIDTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_width_validation() {
        assert!(GridStore::new(16).is_ok());
        assert!(GridStore::new(256).is_ok());
        assert_eq!(
            GridStore::new(100).unwrap_err(),
            ErosionError::InvalidGridSize {
                width: 100,
                tile: 16,
                max: MAX_GRID_WIDTH
            }
        );
        assert!(GridStore::new(0).is_err());
        assert!(validate_grid_width(MAX_GRID_WIDTH).is_ok());
        assert!(validate_grid_width(MAX_GRID_WIDTH + WORKGROUP_SIZE).is_err());
        assert!(validate_grid_width(usize::MAX - usize::MAX % WORKGROUP_SIZE).is_err());
    }

    #[test]
    fn test_access_before_seed_is_buffer_not_ready() {
        let mut store = GridStore::new(16).unwrap();
        assert!(!store.is_ready());
        assert_eq!(
            store.flux().unwrap_err(),
            ErosionError::BufferNotReady {
                buffer: BufferId::Flux
            }
        );
        assert_eq!(
            store.commit(BufferId::Velocity).unwrap_err(),
            ErosionError::BufferNotReady {
                buffer: BufferId::Velocity
            }
        );
    }

    #[test]
    fn test_seed_zeroes_water_and_sediment() {
        let mut store = GridStore::new(16).unwrap();
        let bedrock: Vec<f32> = (0..256).map(|i| i as f32 * 0.5).collect();
        store.seed(&bedrock).unwrap();

        let height = store.height().unwrap();
        assert_eq!(height[10].bedrock, 5.0);
        assert!(height.iter().all(|c| c.water == 0.0 && c.sediment == 0.0));
        assert!(store.flux().unwrap().iter().all(|f| f.total() == 0.0));
    }

    #[test]
    fn test_seed_rejects_wrong_length() {
        let mut store = GridStore::new(16).unwrap();
        assert_eq!(
            store.seed(&[0.0; 10]).unwrap_err(),
            ErosionError::HeightfieldMismatch {
                expected: 256,
                actual: 10
            }
        );
    }

    #[test]
    fn test_commit_exposes_written_generation() {
        let mut pair = PingPong::filled(4, 0.0_f32);
        {
            let (read, write) = pair.split();
            assert!(read.iter().all(|v| *v == 0.0));
            write.fill(3.0);
        }
        // Uncommitted writes are invisible
        assert_eq!(pair.read()[0], 0.0);
        pair.commit();
        assert_eq!(pair.read()[0], 3.0);
        assert_eq!(pair.generation(), 1);

        pair.write_target().fill(7.0);
        pair.commit();
        assert_eq!(pair.read(), &[7.0; 4]);
        assert_eq!(pair.generation(), 0);
    }

    #[test]
    fn test_height_cell_helpers() {
        let cell = HeightCell {
            bedrock: 2.0,
            water: 0.5,
            ..HeightCell::default()
        };
        assert_eq!(cell.surface(), 2.5);
        let v = VelocityCell { vx: 3.0, vy: 4.0 };
        assert_eq!(v.speed(), 5.0);
    }
}
