//! File-drop publisher.
//!
//! Posting to a social network is handled by a separate delivery job; this
//! adapter leaves each prepared post as a text file plus its chart in the
//! outbox directory.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::error::MacropostError;
use crate::ports::publisher_port::{PreparedPost, PublisherPort};

pub struct FilePublisher {
    out_dir: PathBuf,
}

impl FilePublisher {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
        }
    }
}

impl PublisherPort for FilePublisher {
    fn publish(&self, post: &PreparedPost) -> Result<(), MacropostError> {
        std::fs::create_dir_all(&self.out_dir)?;
        let stem = sanitize(&post.indicator);
        let text_path = self.out_dir.join(format!("{stem}.txt"));
        let chart_path = self.out_dir.join(format!("{stem}.svg"));
        std::fs::write(&text_path, &post.text).map_err(|e| MacropostError::Publish {
            indicator: post.indicator.clone(),
            reason: format!("{}: {e}", text_path.display()),
        })?;
        std::fs::write(&chart_path, &post.chart_svg).map_err(|e| MacropostError::Publish {
            indicator: post.indicator.clone(),
            reason: format!("{}: {e}", chart_path.display()),
        })?;
        info!(indicator = post.indicator, path = %text_path.display(), "post written");
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_text_and_chart_files() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FilePublisher::new(dir.path());
        let post = PreparedPost {
            indicator: "resultado primário".to_string(),
            text: "texto".to_string(),
            chart_svg: "<svg/>".to_string(),
        };

        publisher.publish(&post).unwrap();
        let text = std::fs::read_to_string(dir.path().join("resultado_primário.txt")).unwrap();
        assert_eq!(text, "texto");
        assert!(dir.path().join("resultado_primário.svg").exists());
    }
}
