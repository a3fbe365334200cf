/// Single board axis index, `0..GRID_SIZE`.
pub type Coord = u8;

/// Two-dimensional cell coordinates `(row, col)`.
pub type Coord2 = (Coord, Coord);

/// Cell value: `0` means empty, `1..=9` is a placed digit.
pub type Digit = u8;

/// Backend-assigned session identifier, opaque to the client.
pub type GameId = i64;

/// Board edge length.
pub const GRID_SIZE: Coord = 9;

/// Edge length of one 3x3 box.
pub const BOX_SIZE: Coord = 3;

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}
