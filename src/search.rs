//! Two-source conversation search
//!
//! Search results come from two places: an instant local substring filter
//! over the cached conversation list, and a backend semantic search that
//! is debounced and may fail. The merger runs the local filter on every
//! keystroke, schedules at most one in-flight semantic request, and
//! combines both result sets under a fixed precedence: semantic matches
//! first in backend relevance order, then local-only matches, deduplicated
//! by conversation id. A semantic failure degrades to local-only results,
//! never to an error state.

use crate::client::types::Conversation;
use crate::client::Backend;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Whether a snapshot is still waiting on the semantic stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStage {
    /// Instant local matches; a semantic request is still pending
    #[default]
    Pending,
    /// Final results for this query (semantic merged in, or not needed)
    Complete,
    /// The semantic request failed; local matches are final
    Degraded,
}

/// A published snapshot of search results
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// The query these results answer
    pub query: String,
    /// Merged result list, semantic matches first
    pub conversations: Vec<Conversation>,
    /// Pipeline stage this snapshot represents
    pub stage: SearchStage,
}

impl SearchResults {
    /// True when the semantic request failed and only local matches remain
    pub fn is_degraded(&self) -> bool {
        self.stage == SearchStage::Degraded
    }
}

/// Case-insensitive local filter over cached conversations
///
/// A conversation matches when the query appears in its title, summary,
/// any topic tag, its status word, or the content of any cached message.
/// An empty query matches everything.
pub fn local_filter(conversations: &[Conversation], query: &str) -> Vec<Conversation> {
    if query.is_empty() {
        return conversations.to_vec();
    }
    let needle = query.to_lowercase();

    conversations
        .iter()
        .filter(|c| conversation_matches(c, &needle))
        .cloned()
        .collect()
}

fn conversation_matches(conversation: &Conversation, needle: &str) -> bool {
    if conversation.title.to_lowercase().contains(needle) {
        return true;
    }
    if let Some(summary) = &conversation.summary {
        if summary.to_lowercase().contains(needle) {
            return true;
        }
    }
    if conversation
        .topics
        .iter()
        .any(|t| t.to_lowercase().contains(needle))
    {
        return true;
    }
    if conversation.status.as_str().contains(needle) {
        return true;
    }
    if let Some(messages) = &conversation.messages {
        if messages
            .iter()
            .any(|m| m.content.to_lowercase().contains(needle))
        {
            return true;
        }
    }
    false
}

/// Merge semantic and local matches under the fixed precedence rule
///
/// Semantic results keep their backend relevance order and come first;
/// local matches that the semantic set did not already contain follow in
/// their original order. Conversations are deduplicated by id, with the
/// semantic copy winning.
///
/// # Examples
///
/// ```
/// use chatsync::search::merge_results;
/// # use chatsync::client::types::{Conversation, ConversationStatus};
/// # use chrono::Utc;
/// # fn conv(id: u64) -> Conversation {
/// #     Conversation {
/// #         id,
/// #         title: format!("c{id}"),
/// #         status: ConversationStatus::Active,
/// #         start_time: Utc::now(),
/// #         end_time: None,
/// #         summary: None,
/// #         topics: vec![],
/// #         message_count: 0,
/// #         duration_seconds: None,
/// #         messages: None,
/// #     }
/// # }
/// let merged = merge_results(vec![conv(3), conv(1)], vec![conv(1), conv(2), conv(3)]);
/// let ids: Vec<u64> = merged.iter().map(|c| c.id).collect();
/// assert_eq!(ids, vec![3, 1, 2]);
/// ```
pub fn merge_results(semantic: Vec<Conversation>, local: Vec<Conversation>) -> Vec<Conversation> {
    let mut merged = semantic;
    for candidate in local {
        if !merged.iter().any(|c| c.id == candidate.id) {
            merged.push(candidate);
        }
    }
    merged
}

/// Lock a mutex, recovering the guard if a panicking thread poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Publish a snapshot unless the query generation has moved on
///
/// The generation re-check runs inside the channel's modify closure, which
/// serializes against every other publish on the channel. A concurrent
/// `query` bumps the counter before it publishes, so the stale snapshot is
/// either rejected here or overwritten by the newer publish; it can never
/// land last.
fn publish_if_current(
    results_tx: &watch::Sender<SearchResults>,
    counter: &AtomicU64,
    generation: u64,
    snapshot: SearchResults,
) {
    let mut snapshot = Some(snapshot);
    results_tx.send_if_modified(|current| {
        if counter.load(Ordering::SeqCst) != generation {
            return false;
        }
        if let Some(snapshot) = snapshot.take() {
            *current = snapshot;
        }
        true
    });
}

/// Debounced two-source search with stale-response suppression
///
/// Every call to [`SearchMerger::query`] publishes local matches right
/// away and restarts the debounce window for the semantic request. Each
/// call bumps a generation counter; a semantic task re-checks the counter
/// after its debounce sleep and again after the network round trip, so a
/// response for superseded input is dropped instead of overwriting newer
/// results.
pub struct SearchMerger {
    backend: Arc<dyn Backend>,
    debounce: Duration,
    min_semantic_chars: usize,
    generation: Arc<AtomicU64>,
    results_tx: Arc<watch::Sender<SearchResults>>,
    semantic_task: Mutex<Option<JoinHandle<()>>>,
}

impl SearchMerger {
    /// Create a merger publishing on a fresh results channel
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend client used for semantic searches
    /// * `debounce` - Quiet period before a semantic request is issued
    /// * `min_semantic_chars` - Queries shorter than this stay local-only
    pub fn new(backend: Arc<dyn Backend>, debounce: Duration, min_semantic_chars: usize) -> Self {
        let (results_tx, _) = watch::channel(SearchResults::default());
        Self {
            backend,
            debounce,
            min_semantic_chars,
            generation: Arc::new(AtomicU64::new(0)),
            results_tx: Arc::new(results_tx),
            semantic_task: Mutex::new(None),
        }
    }

    /// Subscribe to published result snapshots
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results_tx.subscribe()
    }

    /// The most recently published snapshot
    pub fn current(&self) -> SearchResults {
        self.results_tx.borrow().clone()
    }

    /// Run a search over the given cached pool
    ///
    /// Local matches publish immediately. When the query meets the
    /// semantic length threshold, a semantic request is scheduled behind
    /// the debounce window, superseding any semantic request still
    /// pending from earlier input.
    ///
    /// # Arguments
    ///
    /// * `query` - Current search input
    /// * `pool` - Cached conversations to filter locally
    pub fn query(&self, query: &str, pool: Vec<Conversation>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let local = local_filter(&pool, query);
        tracing::debug!(
            "Local filter for {:?}: {} of {} conversations",
            query,
            local.len(),
            pool.len()
        );

        let semantic_eligible = query.chars().count() >= self.min_semantic_chars;
        self.results_tx.send_replace(SearchResults {
            query: query.to_string(),
            conversations: local.clone(),
            // A short query never gets a semantic stage; its local snapshot
            // is final.
            stage: if semantic_eligible {
                SearchStage::Pending
            } else {
                SearchStage::Complete
            },
        });

        if !semantic_eligible {
            return;
        }

        let backend = Arc::clone(&self.backend);
        let counter = Arc::clone(&self.generation);
        let results_tx = Arc::clone(&self.results_tx);
        let debounce = self.debounce;
        let query = query.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if counter.load(Ordering::SeqCst) != generation {
                tracing::debug!("Semantic search for {:?} superseded before dispatch", query);
                return;
            }

            let outcome = backend.search_conversations(&query, true).await;

            if counter.load(Ordering::SeqCst) != generation {
                tracing::debug!("Dropping stale semantic response for {:?}", query);
                return;
            }

            match outcome {
                Ok(semantic) => {
                    tracing::debug!(
                        "Semantic search for {:?}: {} matches",
                        query,
                        semantic.len()
                    );
                    publish_if_current(
                        &results_tx,
                        &counter,
                        generation,
                        SearchResults {
                            query,
                            conversations: merge_results(semantic, local),
                            stage: SearchStage::Complete,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Semantic search for {:?} failed, keeping local matches: {}",
                        query,
                        e
                    );
                    publish_if_current(
                        &results_tx,
                        &counter,
                        generation,
                        SearchResults {
                            query,
                            conversations: local,
                            stage: SearchStage::Degraded,
                        },
                    );
                }
            }
        });

        *lock(&self.semantic_task) = Some(handle);
    }

    /// Cancel any pending semantic request and reset to the unfiltered pool
    ///
    /// # Arguments
    ///
    /// * `pool` - Cached conversations to publish as the full, unfiltered
    ///   listing
    pub fn clear(&self, pool: Vec<Conversation>) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.results_tx.send_replace(SearchResults {
            query: String::new(),
            conversations: pool,
            stage: SearchStage::Complete,
        });
    }

    /// Take the handle of the most recently scheduled semantic task
    ///
    /// Lets tests await completion deterministically; the pipeline itself
    /// never depends on the handle being observed.
    pub fn take_semantic_handle(&self) -> Option<JoinHandle<()>> {
        lock(&self.semantic_task).take()
    }
}
