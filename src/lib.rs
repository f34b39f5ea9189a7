//! Classic Doom software renderer.
//!
//! A fixed-point BSP walk draws walls column by column, collects floors
//! and ceilings into visplanes drawn as spans, and finishes with sprites
//! and see-through mid textures back to front. [`wad`] turns IWAD maps
//! into the [`world`] data the renderer reads; [`renderer`] holds the
//! renderer itself.

pub mod config;
pub mod draw;
pub mod error;
pub mod fixed;
pub mod framebuffer;
pub mod renderer;
pub mod view;
pub mod wad;
pub mod world;
