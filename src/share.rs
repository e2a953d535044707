use flume::{Receiver, Sender};
use tracing::{debug, warn};
use url::Url;

use crate::post::PostDraft;

/// What the share entry point hands over to the posting flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShareEvent {
    SharedPage { url: String, title: String },
    ShareError(String),
}

pub fn channel() -> (ShareSender, ShareReceiver) {
    let (sender, receiver) = flume::unbounded();
    (ShareSender { sender }, ShareReceiver { receiver })
}

#[derive(Clone)]
pub struct ShareSender {
    sender: Sender<ShareEvent>,
}

impl ShareSender {
    /// Share a page. Only http(s) links are accepted, anything else is
    /// delivered as a share error.
    pub fn share(&self, url: &str, title: &str) {
        let url = url.trim();
        let event = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                debug!(%url, "page shared");
                ShareEvent::SharedPage {
                    url: url.to_owned(),
                    title: title.trim().to_owned(),
                }
            }
            Ok(parsed) => ShareEvent::ShareError(format!(
                "Only web pages can be shared, got a {} link",
                parsed.scheme()
            )),
            Err(_) => ShareEvent::ShareError("No content to share".to_owned()),
        };

        self.send(event);
    }

    fn send(&self, event: ShareEvent) {
        if self.sender.send(event).is_err() {
            warn!("share receiver dropped, event discarded");
        }
    }
}

pub struct ShareReceiver {
    receiver: Receiver<ShareEvent>,
}

impl ShareReceiver {
    /// Apply every pending event to the draft, in the order they were sent.
    pub fn drain_into(&self, draft: &mut PostDraft) -> usize {
        let mut applied = 0;
        for event in self.receiver.try_iter() {
            draft.apply(event);
            applied += 1;
        }
        applied
    }
}
