//! Character classification for the streaming renderer.
//!
//! Pure functions: which characters are held back as triggers, what a run of
//! identical triggers means, whether a run may still change with more input,
//! and whether a single-quote "code span" is really an apostrophe.

/// Characters that may begin or end a markup construct.
pub const TRIGGER_CHARS: [char; 8] = ['*', '_', '`', '\'', '#', '-', '=', '+'];

/// Contraction tails that follow an apostrophe preceded by a letter.
const CONTRACTIONS: [&str; 7] = ["m", "re", "ll", "s", "d", "ve", "t"];

/// Clipped words that start with an apostrophe.
const IDIOMS: [&str; 5] = ["clock", "til", "bout", "cause", "em"];

/// Upper bound on the text examined after an apostrophe. The longest pattern
/// plus its terminator is well below this.
const APOSTROPHE_WINDOW: usize = 16;

pub fn is_trigger(c: char) -> bool {
    TRIGGER_CHARS.contains(&c)
}

/// A maximal run of one trigger character inside the trigger stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub ch: char,
    pub len: usize,
    /// Byte offset of the run's first character in the raw stream
    pub offset: usize,
}

impl Run {
    pub fn literal(&self) -> String {
        std::iter::repeat_n(self.ch, self.len).collect()
    }
}

/// Meaning of a run considered on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunClass {
    Bold,
    InlineCode,
    Fence,
    HorizontalRule,
    /// Heading marker; only meaningful at line start before a space
    Heading(u8),
    Literal,
}

pub fn classify_run(ch: char, len: usize) -> RunClass {
    match (ch, len) {
        ('*' | '_', 2) => RunClass::Bold,
        ('`' | '\'', 1) => RunClass::InlineCode,
        ('`' | '\'', 3) => RunClass::Fence,
        ('-' | '=', n) if n >= 3 => RunClass::HorizontalRule,
        ('#', n @ 1..=6) => RunClass::Heading(n as u8),
        _ => RunClass::Literal,
    }
}

/// Whether one more identical character could change how a trailing run
/// resolves. Such a run must wait for the next chunk or the end of input.
///
/// Splitting a run in two yields two runs, so every character whose short
/// runs carry meaning stays open at any length. `#` only matters as a heading
/// marker and `+` never does.
pub fn is_open_run(ch: char, len: usize, heading_possible: bool) -> bool {
    match ch {
        '*' | '_' | '`' | '\'' | '-' | '=' => true,
        '#' => heading_possible && len <= 6,
        _ => false,
    }
}

/// Split a trigger stack of `(char, raw offset)` pairs into runs.
pub fn runs(stack: &[(char, usize)]) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::new();
    for &(ch, offset) in stack {
        match out.last_mut() {
            Some(run) if run.ch == ch => run.len += 1,
            _ => out.push(Run { ch, len: 1, offset }),
        }
    }
    out
}

/// Whether the last three characters written into a code block close it.
pub fn is_closing_fence(tail: &str) -> bool {
    tail == "```" || tail == "'''"
}

/// Decide whether a single quote that opened "inline code" is an apostrophe.
///
/// `before` is the character preceding the quote, `after` everything received
/// since it. With `at_end` the stream is over, which terminates a word.
pub fn is_false_code(before: Option<char>, after: &str, at_end: bool) -> bool {
    if after.len() > APOSTROPHE_WINDOW {
        return false;
    }

    let word_end = after
        .find(|c: char| !c.is_alphanumeric())
        .unwrap_or(after.len());
    let (word, rest) = after.split_at(word_end);
    if rest.is_empty() && !at_end {
        return false;
    }

    // Possessive: dogs' bone
    if word.is_empty() {
        return before.is_some_and(|b| b.eq_ignore_ascii_case(&'s'));
    }

    let word = word.to_lowercase();
    if before.is_some_and(char::is_alphabetic) && CONTRACTIONS.contains(&word.as_str()) {
        return true;
    }
    IDIOMS.contains(&word.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_set() {
        for c in "*_`'#-=+".chars() {
            assert!(is_trigger(c));
        }
        assert!(!is_trigger('a'));
        assert!(!is_trigger(' '));
        assert!(!is_trigger('\n'));
    }

    #[test]
    fn run_classes() {
        assert_eq!(classify_run('*', 2), RunClass::Bold);
        assert_eq!(classify_run('_', 2), RunClass::Bold);
        assert_eq!(classify_run('*', 1), RunClass::Literal);
        assert_eq!(classify_run('*', 3), RunClass::Literal);
        assert_eq!(classify_run('`', 1), RunClass::InlineCode);
        assert_eq!(classify_run('\'', 3), RunClass::Fence);
        assert_eq!(classify_run('`', 2), RunClass::Literal);
        assert_eq!(classify_run('-', 3), RunClass::HorizontalRule);
        assert_eq!(classify_run('=', 7), RunClass::HorizontalRule);
        assert_eq!(classify_run('#', 3), RunClass::Heading(3));
        assert_eq!(classify_run('#', 7), RunClass::Literal);
        assert_eq!(classify_run('+', 1), RunClass::Literal);
    }

    #[test]
    fn open_runs_stay_pending() {
        assert!(is_open_run('*', 1, false));
        assert!(is_open_run('*', 2, false));
        assert!(is_open_run('*', 3, false));
        assert!(is_open_run('_', 5, false));
        assert!(is_open_run('`', 3, false));
        assert!(is_open_run('`', 4, false));
        assert!(is_open_run('\'', 1, false));
        assert!(is_open_run('-', 3, false));
        assert!(is_open_run('=', 9, false));
        assert!(is_open_run('#', 2, true));
        assert!(is_open_run('#', 6, true));
        assert!(!is_open_run('#', 7, true));
        assert!(!is_open_run('#', 2, false));
        assert!(!is_open_run('+', 1, true));
    }

    #[test]
    fn runs_split_mixed_stack() {
        let stack = [('*', 0), ('*', 1), ('`', 2)];
        let runs = runs(&stack);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], Run { ch: '*', len: 2, offset: 0 });
        assert_eq!(runs[1], Run { ch: '`', len: 1, offset: 2 });
        assert_eq!(runs[0].literal(), "**");
    }

    #[test]
    fn contractions_need_terminator() {
        assert!(!is_false_code(Some('t'), "s", false));
        assert!(is_false_code(Some('t'), "s ", false));
        assert!(is_false_code(Some('t'), "s", true));
        assert!(is_false_code(Some('n'), "t,", false));
        assert!(is_false_code(Some('I'), "M ", false));
        assert!(!is_false_code(Some('t'), "sx ", false));
    }

    #[test]
    fn contractions_need_letter_before() {
        assert!(!is_false_code(Some(' '), "s ", false));
        assert!(!is_false_code(None, "re ", false));
    }

    #[test]
    fn idioms_match_anywhere() {
        assert!(is_false_code(Some(' '), "clock ", false));
        assert!(is_false_code(None, "til.", false));
        assert!(is_false_code(Some('('), "em)", false));
        assert!(!is_false_code(Some(' '), "clockwork ", false));
    }

    #[test]
    fn possessives() {
        assert!(is_false_code(Some('s'), " ", false));
        assert!(is_false_code(Some('s'), "", true));
        assert!(is_false_code(Some('s'), ".", false));
        assert!(!is_false_code(Some('s'), "", false));
        assert!(!is_false_code(Some('x'), " ", false));
    }

    #[test]
    fn genuine_code_is_kept() {
        assert!(!is_false_code(Some(' '), "code'", false));
        assert!(!is_false_code(Some('x'), "abc ", false));
        assert!(!is_false_code(Some('t'), "s and a very long tail", false));
    }

    #[test]
    fn closing_fences() {
        assert!(is_closing_fence("```"));
        assert!(is_closing_fence("'''"));
        assert!(!is_closing_fence("``'"));
        assert!(!is_closing_fence("``"));
    }
}
