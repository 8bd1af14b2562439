//! Command menu: action registry, scope filtering, fuzzy/alias/keyword
//! matching, paging, and agent-type grouping.

use std::sync::Arc;

use super::{Modal, ModalKeyOutcome, Overlay};
use crate::input::{Key, Keystroke};

/// Agent types used for empty-query grouping, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentType {
    Codex,
    Claude,
    Cursor,
    Terminal,
    Critique,
}

const AGENT_GROUP_ORDER: &[AgentType] = &[
    AgentType::Codex,
    AgentType::Claude,
    AgentType::Cursor,
    AgentType::Terminal,
    AgentType::Critique,
];

/// Scope the command menu is currently displaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuScope {
    All,
    Shortcuts,
    ThemeSelect,
    ThreadStart,
}

/// A single action entry in the command menu.
#[derive(Clone)]
pub struct Action {
    pub id: String,
    pub title: String,
    pub aliases: Vec<String>,
    pub keywords: Vec<String>,
    pub detail: Option<String>,
    pub screen_label: Option<String>,
    pub section_label: Option<String>,
    pub binding_hint: Option<String>,
    pub priority: Option<i32>,
    pub agent_type: Option<AgentType>,
    /// Whether this action currently applies in the calling context; absent
    /// means "always".
    pub available: bool,
    /// Opaque handler invoked on submit; intentionally untyped here since
    /// the actual runtime context type lives in `crate::runtime`.
    pub run: Arc<dyn Fn() + Send + Sync>,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("id", &self.id).finish()
    }
}

/// A provider contributes zero or more actions given the current scope.
/// Context (workspace snapshot, directory, focus) is provided by the caller
/// through a closure capture rather than a generic parameter, favoring
/// tagged dispatch over generics-heavy plumbing.
pub type Provider = Box<dyn Fn(MenuScope) -> Vec<Action>>;

#[derive(Default)]
pub struct CommandMenuRegistry {
    providers: Vec<Provider>,
}

impl CommandMenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Provider) {
        self.providers.push(provider);
    }

    /// Collect all actions for `scope`, applying scope filtering and
    /// dropping duplicate ids in favor of the first registrant.
    pub fn collect(&self, scope: MenuScope) -> Vec<Action> {
        let mut seen = std::collections::HashSet::new();
        let mut out = vec![];
        for provider in &self.providers {
            for action in provider(scope) {
                if !action.available {
                    continue;
                }
                if !scope_allows(scope, &action.id) {
                    continue;
                }
                if seen.insert(action.id.clone()) {
                    out.push(action);
                }
            }
        }
        out
    }
}

fn scope_allows(scope: MenuScope, id: &str) -> bool {
    let is_theme = id.starts_with("theme.set.");
    let is_shortcut = id.starts_with("shortcut.binding.");
    let is_thread_start = id.starts_with("thread.start.") || id.starts_with("thread.install.");

    match scope {
        MenuScope::All => !is_theme && !is_shortcut,
        MenuScope::ThemeSelect => is_theme,
        MenuScope::Shortcuts => is_shortcut,
        MenuScope::ThreadStart => is_thread_start,
    }
}

/// A scored match against the current query.
#[derive(Debug, Clone)]
pub struct ScoredAction {
    pub action_id: String,
    pub score: i64,
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .trim()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Score a single action against tokenized query terms. Each token must
/// prefix-match at least one of (title words, aliases, keywords) to
/// contribute; an action where any token matches nothing scores `None`
/// (excluded from results).
fn score_action(action: &Action, tokens: &[String]) -> Option<i64> {
    if tokens.is_empty() {
        return Some(0);
    }

    let title_lower = action.title.to_lowercase();
    let title_words: Vec<&str> = title_lower.split_whitespace().collect();
    let aliases_lower: Vec<String> = action.aliases.iter().map(|a| a.to_lowercase()).collect();
    let keywords_lower: Vec<String> = action.keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut total = 0i64;
    for token in tokens {
        let mut matched = false;
        let mut best = 0i64;

        if title_lower.starts_with(token.as_str()) {
            matched = true;
            best = best.max(30);
        }
        for (idx, word) in title_words.iter().enumerate() {
            if word.starts_with(token.as_str()) {
                matched = true;
                best = best.max(20 - idx as i64);
            }
        }
        for alias in &aliases_lower {
            if alias.starts_with(token.as_str()) {
                matched = true;
                best = best.max(15);
            }
        }
        for keyword in &keywords_lower {
            if keyword.starts_with(token.as_str()) {
                matched = true;
                best = best.max(10);
            }
        }

        if !matched {
            return None;
        }
        total += best;
    }
    Some(total)
}

/// Group key for empty-query display.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Agent(AgentType),
    Ungrouped,
}

/// Compute the matched/paged result set for `query` against `actions`.
/// `limit = None` returns every match (used for unbounded paged overlays).
pub fn search(actions: &[Action], query: &str, limit: Option<usize>) -> Vec<Action> {
    let tokens = tokenize(query);

    if tokens.is_empty() {
        return group_for_empty_query(actions, limit);
    }

    let mut scored: Vec<(i64, usize, Action)> = actions
        .iter()
        .enumerate()
        .filter_map(|(idx, action)| score_action(action, &tokens).map(|s| (s, idx, action.clone())))
        .collect();

    // Higher score first; stable by original index for ties.
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let iter = scored.into_iter().map(|(_, _, a)| a);
    match limit {
        Some(n) => iter.take(n).collect(),
        None => iter.collect(),
    }
}

fn group_for_empty_query(actions: &[Action], limit: Option<usize>) -> Vec<Action> {
    let mut grouped: Vec<Action> = vec![];
    let mut ungrouped: Vec<Action> = vec![];

    for action in actions {
        if action.agent_type.is_some() {
            grouped.push(action.clone());
        } else {
            ungrouped.push(action.clone());
        }
    }

    grouped.sort_by_key(|a| {
        let rank = AGENT_GROUP_ORDER
            .iter()
            .position(|g| Some(*g) == a.agent_type)
            .unwrap_or(usize::MAX);
        (rank, a.title.clone())
    });

    ungrouped.sort_by(|a, b| {
        b.priority
            .unwrap_or(0)
            .cmp(&a.priority.unwrap_or(0))
            .then_with(|| a.title.cmp(&b.title))
    });

    grouped.extend(ungrouped);
    match limit {
        Some(n) => grouped.into_iter().take(n).collect(),
        None => grouped,
    }
}

pub const DEFAULT_PAGE_LIMIT: usize = 8;

/// Reducer state for the text-input portion of the command menu.
#[derive(Debug, Clone, Default)]
pub struct CommandMenuState {
    pub query: String,
    pub selected_index: usize,
}

/// Outcome of feeding one keystroke into the reducer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReduceOutcome {
    pub submit: Option<usize>,
}

impl CommandMenuState {
    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.selected_index = 0;
    }

    pub fn backspace(&mut self) {
        self.query.pop();
        self.selected_index = 0;
    }

    pub fn move_selection(&mut self, delta: i32, result_count: usize) {
        if result_count == 0 {
            self.selected_index = 0;
            return;
        }
        let len = result_count as i32;
        let mut idx = self.selected_index as i32 + delta;
        idx = ((idx % len) + len) % len;
        self.selected_index = idx as usize;
    }

    /// Enter: returns the selected index into the current result set, if any.
    pub fn submit(&self, result_count: usize) -> ReduceOutcome {
        if result_count == 0 {
            ReduceOutcome { submit: None }
        } else {
            ReduceOutcome {
                submit: Some(self.selected_index.min(result_count - 1)),
            }
        }
    }
}

/// The overlay that feeds keystrokes into [`CommandMenuState`] against a
/// fixed, pre-scoped action list. `Enter` runs the selected action's handler
/// immediately and exposes its id through [`Modal::text_value`] so the
/// caller can log or react to which one fired.
pub struct CommandMenuModal {
    actions: Vec<Action>,
    state: CommandMenuState,
    dismissed: bool,
    submitted_action_id: Option<String>,
}

impl CommandMenuModal {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions,
            state: CommandMenuState::default(),
            dismissed: false,
            submitted_action_id: None,
        }
    }

    fn results(&self) -> Vec<Action> {
        search(&self.actions, &self.state.query, Some(DEFAULT_PAGE_LIMIT))
    }
}

impl Modal for CommandMenuModal {
    fn build_overlay(&self, cols: u16, viewport_rows: u16) -> Overlay {
        let width = cols.min(70).max(30);
        let height = viewport_rows.min(16).max(6);
        let results = self.results();

        let mut rows = vec![format!("> {}", self.state.query)];
        for (idx, action) in results.iter().enumerate() {
            let marker = if idx == self.state.selected_index { "> " } else { "  " };
            rows.push(format!("{marker}{}", action.title));
        }

        Overlay {
            left: cols.saturating_sub(width) / 2,
            top: 1,
            width,
            height,
            rows,
        }
    }

    fn dismiss(&mut self) {
        self.dismissed = true;
    }

    fn on_key(&mut self, stroke: &Keystroke) -> ModalKeyOutcome {
        let result_count = self.results().len();
        match stroke.key {
            Key::Char(c) if !stroke.ctrl && !stroke.meta => {
                self.state.push_char(c);
                ModalKeyOutcome::Consumed
            }
            Key::Backspace => {
                self.state.backspace();
                ModalKeyOutcome::Consumed
            }
            Key::Up => {
                self.state.move_selection(-1, result_count);
                ModalKeyOutcome::Consumed
            }
            Key::Down => {
                self.state.move_selection(1, result_count);
                ModalKeyOutcome::Consumed
            }
            Key::Enter => match self.state.submit(result_count).submit {
                Some(idx) => {
                    if let Some(action) = self.results().get(idx) {
                        self.submitted_action_id = Some(action.id.clone());
                        (action.run)();
                    }
                    ModalKeyOutcome::Submit
                }
                None => ModalKeyOutcome::Consumed,
            },
            _ => ModalKeyOutcome::Ignored,
        }
    }

    fn text_value(&self) -> Option<&str> {
        self.submitted_action_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str, title: &str) -> Action {
        Action {
            id: id.to_string(),
            title: title.to_string(),
            aliases: vec![],
            keywords: vec![],
            detail: None,
            screen_label: None,
            section_label: None,
            binding_hint: None,
            priority: None,
            agent_type: None,
            available: true,
            run: Arc::new(|| {}),
        }
    }

    #[test]
    fn registry_drops_duplicate_ids_keeping_first_registrant() {
        let mut registry = CommandMenuRegistry::new();
        registry.register(Box::new(|_scope| vec![action("dup", "First")]));
        registry.register(Box::new(|_scope| vec![action("dup", "Second")]));
        let actions = registry.collect(MenuScope::All);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "First");
    }

    #[test]
    fn theme_actions_hidden_in_all_exclusive_in_theme_select() {
        let mut registry = CommandMenuRegistry::new();
        registry.register(Box::new(|_scope| {
            vec![action("theme.set.dark", "Dark"), action("conversation.new", "New")]
        }));
        let all = registry.collect(MenuScope::All);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "conversation.new");

        let theme = registry.collect(MenuScope::ThemeSelect);
        assert_eq!(theme.len(), 1);
        assert_eq!(theme[0].id, "theme.set.dark");
    }

    #[test]
    fn thread_start_scope_filters_to_thread_prefixes() {
        let mut registry = CommandMenuRegistry::new();
        registry.register(Box::new(|_scope| {
            vec![
                action("thread.start.codex", "Start Codex"),
                action("thread.install.cursor", "Install Cursor"),
                action("conversation.new", "New"),
            ]
        }));
        let actions = registry.collect(MenuScope::ThreadStart);
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn empty_query_groups_by_agent_type_first() {
        let mut codex = action("a1", "Alpha");
        codex.agent_type = Some(AgentType::Codex);
        let mut claude = action("a2", "Beta");
        claude.agent_type = Some(AgentType::Claude);
        let ungrouped = action("a3", "Zeta");

        let actions = vec![ungrouped.clone(), claude.clone(), codex.clone()];
        let results = search(&actions, "", None);
        assert_eq!(results[0].id, "a1"); // codex group first
        assert_eq!(results[1].id, "a2"); // claude group second
        assert_eq!(results[2].id, "a3"); // ungrouped last
    }

    #[test]
    fn token_prefix_scoring_matches_title_and_keywords() {
        let mut a = action("new-thread", "New Thread");
        a.keywords = vec!["spawn".to_string()];
        let b = action("archive", "Archive Conversation");
        let actions = vec![a.clone(), b.clone()];

        let results = search(&actions, "spa", None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "new-thread");
    }

    #[test]
    fn paging_respects_default_limit() {
        let actions: Vec<Action> = (0..20).map(|i| action(&format!("a{i}"), &format!("Action {i}"))).collect();
        let results = search(&actions, "action", Some(DEFAULT_PAGE_LIMIT));
        assert_eq!(results.len(), DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn reducer_cycles_selection_with_wrap() {
        let mut state = CommandMenuState::default();
        state.move_selection(-1, 3);
        assert_eq!(state.selected_index, 2);
        state.move_selection(1, 3);
        assert_eq!(state.selected_index, 0);
    }

    #[test]
    fn reducer_push_and_backspace_resets_selection() {
        let mut state = CommandMenuState::default();
        state.selected_index = 2;
        state.push_char('a');
        assert_eq!(state.query, "a");
        assert_eq!(state.selected_index, 0);
        state.selected_index = 1;
        state.backspace();
        assert_eq!(state.query, "");
        assert_eq!(state.selected_index, 0);
    }

    fn key(c: char) -> Keystroke {
        Keystroke {
            key: Key::Char(c),
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        }
    }

    #[test]
    fn modal_runs_selected_action_on_enter_and_exposes_its_id() {
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran_clone = ran.clone();
        let mut a = action("archive", "Archive Conversation");
        a.run = Arc::new(move || ran_clone.store(true, std::sync::atomic::Ordering::SeqCst));
        let mut modal = CommandMenuModal::new(vec![a]);

        assert_eq!(modal.on_key(&key('a')), ModalKeyOutcome::Consumed);
        assert_eq!(
            modal.on_key(&Keystroke {
                key: crate::input::Key::Enter,
                ctrl: false,
                alt: false,
                shift: false,
                meta: false,
            }),
            ModalKeyOutcome::Submit
        );
        assert_eq!(modal.text_value(), Some("archive"));
        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
