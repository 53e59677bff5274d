//! rustyline line source with catalog-driven tab completion.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use incant_terminal::{
    Catalog, CompletionContext, CompletionEngine, Completions, Input, LineSource,
    candidate_entries, panic_message,
};
use incant_types::ReplConfig;
use incant_types::error::{IncantError, Result};

/// Completion helper. Holds the override for the read in progress.
struct IncantHelper {
    engine: CompletionEngine,
    context: CompletionContext,
}

impl IncantHelper {
    fn pairs(&self, completions: &Completions) -> Vec<Pair> {
        candidate_entries(completions, self.engine.catalog())
            .into_iter()
            .map(|(display, replacement)| Pair {
                display,
                replacement,
            })
            .collect()
    }
}

/// Run a completion callback, logging a panic and offering nothing instead
/// of unwinding into the editor.
fn guarded<F>(pos: usize, compute: F) -> rustyline::Result<(usize, Vec<Pair>)>
where
    F: FnOnce() -> (usize, Vec<Pair>),
{
    match panic::catch_unwind(AssertUnwindSafe(compute)) {
        Ok(result) => Ok(result),
        Err(payload) => {
            log::error!("completion failed: {}", panic_message(payload.as_ref()));
            Ok((pos, Vec::new()))
        },
    }
}

impl Helper for IncantHelper {}

impl Highlighter for IncantHelper {}

impl Hinter for IncantHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Validator for IncantHelper {}

impl Completer for IncantHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        guarded(pos, || {
            let completions = self.engine.complete_at(line, pos, &self.context);
            (completions.start(), self.pairs(&completions))
        })
    }
}

/// Interactive line source backed by rustyline.
pub struct EditorSource {
    editor: Editor<IncantHelper, DefaultHistory>,
}

impl EditorSource {
    pub fn new(catalog: Rc<Catalog>, config: &ReplConfig) -> anyhow::Result<Self> {
        let editor_config = Config::builder()
            .max_history_size(config.history_size)?
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut editor = Editor::with_config(editor_config)?;
        editor.set_helper(Some(IncantHelper {
            engine: CompletionEngine::new(catalog),
            context: CompletionContext::new(),
        }));
        Ok(Self { editor })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str, context: &CompletionContext) -> Result<Input> {
        if let Some(helper) = self.editor.helper_mut() {
            helper.context = context.clone();
        }
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty()
                    && let Err(e) = self.editor.add_history_entry(line.as_str())
                {
                    log::warn!("failed to record history: {e}");
                }
                Ok(Input::Line(line))
            },
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::EndOfInput),
            Err(ReadlineError::Io(e)) => Err(IncantError::Io(e)),
            Err(e) => Err(IncantError::Io(std::io::Error::other(e.to_string()))),
        }
    }
}
