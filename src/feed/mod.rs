pub mod display;
pub mod html;

pub use display::EventCard;
