//! Share message built from the current progress.

use crate::ticker::ElapsedDuration;

pub const DEFAULT_HASHTAG: &str = "#DownBad";

/// `"I've been sober free for 2 days and 3 hours! #DownBad"`.
///
/// Under a day the message switches to `"<h>h <m>m <s>s"`, leaving out
/// zero hours and minutes. Seconds are always present.
pub fn share_text(label: &str, elapsed: &ElapsedDuration, hashtag: &str) -> String {
    let mut text = format!("I've been {label} free for ");
    if elapsed.days > 0 {
        text.push_str(&format!("{} days and {} hours", elapsed.days, elapsed.hours));
    } else {
        if elapsed.hours > 0 {
            text.push_str(&format!("{}h ", elapsed.hours));
        }
        if elapsed.minutes > 0 {
            text.push_str(&format!("{}m ", elapsed.minutes));
        }
        text.push_str(&format!("{}s", elapsed.seconds));
    }
    text.push('!');
    if !hashtag.is_empty() {
        text.push(' ');
        text.push_str(hashtag);
    }
    text
}
