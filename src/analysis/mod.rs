pub mod price_synth;

pub use price_synth::{build_board, generate_chart_data, generate_chart_data_at};
