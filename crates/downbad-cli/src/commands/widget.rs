use downbad_core::WidgetSnapshot;

use super::{open_store, CmdResult};

/// One refresh of the home-screen card.
pub async fn run(json: bool) -> CmdResult {
    let store = open_store()?;
    let widget = WidgetSnapshot::capture(&store);
    if json {
        println!("{}", serde_json::to_string_pretty(&widget)?);
    } else {
        println!("{}", widget.render());
    }
    Ok(())
}
