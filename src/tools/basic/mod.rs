//! Callable domain tools: echo and the simulated lookup tools

mod echo;
mod simulated;

pub use echo::EchoTool;
pub use simulated::{Profile, SimulatedTool};

use serde_json::{json, Value};

/// Wrap text in the content envelope tools answer with
pub fn text_content(text: String) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": text
        }]
    })
}
