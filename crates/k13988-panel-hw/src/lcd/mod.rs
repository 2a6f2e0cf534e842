//! LCD display module.
//!
//! Provides the bit-packed framebuffer for the 196x34 monochrome LCD. The
//! framebuffer is pushed to the chip by [`Panel::refresh`](crate::Panel::refresh).

pub mod framebuffer;

pub use framebuffer::Framebuffer;
