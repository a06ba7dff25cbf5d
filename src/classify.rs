//! Incremental descent classification.
//!
//! A query is classified by walking the taxonomy one level at a time. At
//! each level the [`Oracle`] is shown the sibling classes as
//! `"<number> <name>"` options and picks one; the walk then continues into
//! the picked class's children. Below the top level the oracle may also
//! answer [`STOP_TOKEN`] to settle on the current parent class.
//!
//! ```text
//!   level 0: 000 … 600 Technology … 900      oracle → "600"
//!   level 1: 610 … 630 Agriculture …         oracle → "630"
//!   level 2: 631 … 636 Animal husbandry …    oracle → "636"
//!   level 3: 636.1 … 636.7 Dogs …            oracle → "636.7"   (leaf: finished)
//! ```
//!
//! [`Descent`] is an explicit state object: every [`Descent::next`] call
//! makes exactly one oracle call and yields one [`ClassificationUpdate`].
//! Nothing happens between calls, so a caller that stops pulling (client
//! gone, `finished` seen) never triggers further oracle calls. The tree is
//! only borrowed, so any number of descents can run over one taxonomy at
//! the same time.

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::sync::Arc;
use tracing::debug;

use crate::models::{ClassificationUpdate, TaxonomyNode};

/// Reserved oracle answer meaning "the parent class is the best fit".
pub const STOP_TOKEN: &str = "parent";

/// Separator between breadcrumb entries.
pub const BREADCRUMB_SEPARATOR: &str = " > ";

/// One question put to the oracle.
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub query: &'a str,
    /// `"<number> <name>"` per candidate class, in tree order.
    pub options: &'a [String],
    /// Names of the classes chosen so far; empty at the top level.
    pub breadcrumb: &'a str,
    /// `"<number> <name>"` of the current parent. When set, the oracle may
    /// answer [`STOP_TOKEN`].
    pub parent: Option<&'a str>,
}

/// The external judgment capability used by the classifier.
///
/// Implementations return a single token: one option's number, or
/// [`STOP_TOKEN`]. Timeouts and retries belong to the implementation; an
/// `Err` ends the classification and is handed to the caller unchanged.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn judge(&self, request: &JudgeRequest<'_>) -> Result<String>;
}

/// Errors that end a classification.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The oracle answered something that is neither an offered number nor
    /// an allowed stop.
    #[error("No matching node found for response: {response:?}")]
    NoMatchFound { response: String, breadcrumb: String },

    /// The taxonomy level to choose from has no classes (empty tree).
    #[error("No classes to choose from")]
    EmptyLevel,

    /// The oracle call itself failed.
    #[error(transparent)]
    Oracle(anyhow::Error),
}

/// Whether `token` is the stop answer (case-insensitive).
pub fn is_stop_token(token: &str) -> bool {
    token.eq_ignore_ascii_case(STOP_TOKEN)
}

/// Append `name` to `breadcrumb`, inserting the separator when needed.
pub fn extend_breadcrumb(breadcrumb: &mut String, name: &str) {
    if !breadcrumb.is_empty() {
        breadcrumb.push_str(BREADCRUMB_SEPARATOR);
    }
    breadcrumb.push_str(name);
}

/// Shares a loaded taxonomy and an oracle between classification requests.
#[derive(Clone)]
pub struct Classifier {
    tree: Arc<Vec<TaxonomyNode>>,
    oracle: Arc<dyn Oracle>,
}

impl Classifier {
    pub fn new(tree: Vec<TaxonomyNode>, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            tree: Arc::new(tree),
            oracle,
        }
    }

    /// The shared taxonomy, top-level classes first.
    pub fn tree(&self) -> &[TaxonomyNode] {
        &self.tree
    }

    /// Start classifying `query`. No oracle call is made until the
    /// returned descent is pulled.
    pub fn classify(&self, query: &str) -> Descent<'_> {
        Descent::new(self.oracle.as_ref(), &self.tree, query)
    }
}

/// Pull-driven state of one classification: the sibling set being
/// evaluated, its parent and the breadcrumb leading to it.
pub struct Descent<'a> {
    oracle: &'a dyn Oracle,
    query: String,
    candidates: &'a [TaxonomyNode],
    parent: Option<&'a TaxonomyNode>,
    breadcrumb: String,
    done: bool,
}

impl<'a> Descent<'a> {
    pub fn new(oracle: &'a dyn Oracle, tree: &'a [TaxonomyNode], query: &str) -> Self {
        Self {
            oracle,
            query: query.to_string(),
            candidates: tree,
            parent: None,
            breadcrumb: String::new(),
            done: false,
        }
    }

    /// Whether the descent has emitted its final update or failed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Evaluate the current level.
    ///
    /// Returns `None` once a finished update or an error has been yielded.
    pub async fn next(&mut self) -> Option<Result<ClassificationUpdate, ClassifyError>> {
        if self.done {
            return None;
        }

        let result = self.step().await;
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }

    /// Drive the descent to the end, returning every update.
    pub async fn collect_all(mut self) -> Result<Vec<ClassificationUpdate>, ClassifyError> {
        let mut updates = Vec::new();
        while let Some(update) = self.next().await {
            updates.push(update?);
        }
        Ok(updates)
    }

    /// Adapt the descent to a [`Stream`]; still one oracle call per item
    /// pulled.
    pub fn into_stream(self) -> impl Stream<Item = Result<ClassificationUpdate, ClassifyError>> + 'a {
        futures::stream::unfold(self, |mut descent| async move {
            descent.next().await.map(|item| (item, descent))
        })
    }

    async fn step(&mut self) -> Result<ClassificationUpdate, ClassifyError> {
        let candidates = self.candidates;
        let parent = self.parent;

        if candidates.is_empty() {
            return Err(ClassifyError::EmptyLevel);
        }

        let options: Vec<String> = candidates.iter().map(TaxonomyNode::label).collect();
        let parent_label = parent.map(TaxonomyNode::label);
        let request = JudgeRequest {
            query: &self.query,
            options: &options,
            breadcrumb: &self.breadcrumb,
            parent: parent_label.as_deref(),
        };

        let response = self
            .oracle
            .judge(&request)
            .await
            .map_err(ClassifyError::Oracle)?;
        let token = response.trim();
        debug!(breadcrumb = %self.breadcrumb, response = token, "oracle answered");

        let (matched, stopped) = match parent {
            Some(parent) if is_stop_token(token) => (parent, true),
            _ => {
                let node = candidates
                    .iter()
                    .find(|node| node.number == token)
                    .ok_or_else(|| ClassifyError::NoMatchFound {
                        response: token.to_string(),
                        breadcrumb: self.breadcrumb.clone(),
                    })?;
                (node, false)
            }
        };

        let finished = stopped || matched.is_leaf();
        let update = ClassificationUpdate {
            breadcrumb: self.breadcrumb.clone(),
            name: matched.name.clone(),
            number: matched.number.clone(),
            finished,
        };

        if finished {
            self.done = true;
        } else {
            extend_breadcrumb(&mut self.breadcrumb, &matched.name);
            self.candidates = &matched.children;
            self.parent = Some(matched);
        }

        Ok(update)
    }
}
