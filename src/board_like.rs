//! The shared capability set for a templated `BOARD` variant: both `Board`
//! and `PlayoutBoard` implement this so the pattern matcher and playout
//! policy can be written once, generic over either concrete type.

use crate::point::{Color, Point};

pub trait BoardLike {
    fn color_at(&self, p: Point) -> Color;
    fn anchor(&self, p: Point) -> Point;
    fn num_neighbours_of(&self, p: Point, c: Color) -> u32;
    fn in_atari(&self, p: Point) -> bool;
    fn the_liberty(&self, p: Point) -> Option<Point>;
    fn num_liberties(&self, p: Point) -> usize;
    fn is_legal(&self, mv: Point, colour: Color) -> bool;
    fn to_play(&self) -> Color;
    fn last_move(&self) -> Point;
    fn last_move2(&self) -> Point;
    fn is_eyeish(&self, p: Point, colour: Color) -> bool;
    fn is_eye(&self, p: Point, colour: Color) -> bool;

    /// Play `mv` as `colour`, discarding any undo information. Used by
    /// generic playout code that never needs to reverse a move.
    fn play_mut(&mut self, mv: Point, colour: Color) -> Result<(), crate::error::Illegal>;

    fn iter_board<'a>(&'a self) -> Box<dyn Iterator<Item = Point> + 'a>;
    fn iter_empty<'a>(&'a self) -> Box<dyn Iterator<Item = Point> + 'a>;
}
