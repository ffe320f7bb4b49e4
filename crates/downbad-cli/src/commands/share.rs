use downbad_core::{share_text, Config, ElapsedDuration};

use super::{open_store, CmdResult};

pub async fn run(config: &Config) -> CmdResult {
    let store = open_store()?;
    let snapshot = store.snapshot();
    let elapsed = ElapsedDuration::between(snapshot.start, store.clock().now());
    println!(
        "{}",
        share_text(&snapshot.label, &elapsed, &config.display.share_hashtag)
    );
    Ok(())
}
