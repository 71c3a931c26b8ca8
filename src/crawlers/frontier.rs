use std::collections::{HashSet, VecDeque};

/// BFS state owned by a single crawl call
#[derive(Debug)]
pub struct CrawlState {
    visited: HashSet<String>,
    /// Every URL ever queued, so nothing is enqueued twice
    queued: HashSet<String>,
    frontier: VecDeque<(String, usize)>,
    domain: String,
}

impl CrawlState {
    /// Seeds the frontier with `(seed, 0)`
    pub fn new(seed: String, domain: String) -> Self {
        let mut state = Self {
            visited: HashSet::new(),
            queued: HashSet::new(),
            frontier: VecDeque::new(),
            domain,
        };
        state.enqueue(seed, 0);
        state
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Next `(url, depth)` in FIFO order
    pub fn pop(&mut self) -> Option<(String, usize)> {
        self.frontier.pop_front()
    }

    /// Queues `url` unless it was already visited or queued. Returns whether it was added.
    pub fn enqueue(&mut self, url: String, depth: usize) -> bool {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.frontier.push_back((url, depth));
        true
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Records a successfully rendered URL
    pub fn mark_visited(&mut self, url: String) {
        self.visited.insert(url);
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending(&self) -> usize {
        self.frontier.len()
    }

    /// Visited URLs in alphabetical order
    pub fn into_sorted(self) -> Vec<String> {
        let mut urls: Vec<String> = self.visited.into_iter().collect();
        urls.sort();
        urls
    }
}
