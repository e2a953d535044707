use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::share::ShareEvent;
use crate::types::PostContent;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("Please provide both a quotation and your thoughts.")]
    MissingContent,
}

/// A post being composed. Shared pages fill in the source, the user fills in
/// the rest.
#[derive(Clone, Debug, Default)]
pub struct PostDraft {
    pub quotation: String,
    pub thoughts: String,
    pub page_title: String,
    pub source_url: String,
    pub error_message: Option<String>,
}

impl PostDraft {
    pub fn new(quotation: impl Into<String>, thoughts: impl Into<String>) -> Self {
        Self {
            quotation: quotation.into(),
            thoughts: thoughts.into(),
            ..Default::default()
        }
    }

    pub fn apply(&mut self, event: ShareEvent) {
        match event {
            ShareEvent::SharedPage { url, title } => {
                self.source_url = url;
                self.page_title = title;
                self.error_message = None;
            }
            ShareEvent::ShareError(error) => {
                self.error_message = Some(error);
            }
        }
    }

    pub fn can_post(&self) -> bool {
        !self.quotation.trim().is_empty() && !self.thoughts.trim().is_empty()
    }

    pub fn submit(&self, timestamp: DateTime<Utc>) -> Result<PostContent, DraftError> {
        if !self.can_post() {
            return Err(DraftError::MissingContent);
        }

        let source_url = if self.source_url.is_empty() {
            None
        } else {
            Some(self.source_url.clone())
        };

        Ok(PostContent {
            quotation: self.quotation.clone(),
            page_title: self.page_title.clone(),
            thoughts: self.thoughts.clone(),
            timestamp,
            source_url,
        })
    }
}
