mod json;
mod render;
mod tally;

pub use json::to_json;
pub use render::{draw_summary, print_summary, render_lines};
pub use tally::{category_of, Tally};
