use racha_ledger::Category;

/// What a normalized chat message asks the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MarkPaid(Category),
    ListCategory(Category),
    MyStatus,
    ClearCategory(Category),
    /// `limpar ` followed by something that names no category.
    ClearUsage,
    Help,
    /// Ordinary conversation; the bot stays silent.
    NoOp,
}

impl Command {
    /// Commands that only chat administrators may run.
    #[must_use]
    pub const fn requires_admin(self) -> bool {
        matches!(self, Self::ClearCategory(_) | Self::ClearUsage)
    }
}

/// How a rule compares its literal with the token.
///
/// Payment and report phrases are `Contains` so they survive surrounding
/// words; help words are `Exact` so ordinary chatter never triggers them.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Contains(&'static str),
    Prefix(&'static str),
    Exact(&'static str),
}

impl Pattern {
    #[cfg(test)]
    const fn literal(self) -> &'static str {
        match self {
            Self::Contains(text) | Self::Prefix(text) | Self::Exact(text) => text,
        }
    }

    fn matches(self, token: &str) -> bool {
        match self {
            Self::Contains(needle) => token.contains(needle),
            Self::Prefix(prefix) => token.starts_with(prefix),
            Self::Exact(word) => token == word,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Fixed(Command),
    /// Resolve the category from whatever follows the prefix.
    ClearTarget,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    pattern: Pattern,
    outcome: Outcome,
}

impl Rule {
    const fn contains(needle: &'static str, command: Command) -> Self {
        Self {
            pattern: Pattern::Contains(needle),
            outcome: Outcome::Fixed(command),
        }
    }

    const fn exact(word: &'static str, command: Command) -> Self {
        Self {
            pattern: Pattern::Exact(word),
            outcome: Outcome::Fixed(command),
        }
    }
}

const CLEAR_PREFIX: &str = "limpar ";

/// Evaluated top to bottom; the first match wins. Literals are written in
/// normalized form, since tokens never carry accents.
const RULES: &[Rule] = &[
    Rule::contains("paguei mensalidade", Command::MarkPaid(Category::Mensalidade)),
    Rule::contains("paguei churrasco", Command::MarkPaid(Category::Churrasco)),
    Rule::contains("paguei diaria", Command::MarkPaid(Category::Diaria)),
    Rule::contains("lista mensal", Command::ListCategory(Category::Mensalidade)),
    Rule::contains("lista churrasco", Command::ListCategory(Category::Churrasco)),
    Rule::contains("lista diaria", Command::ListCategory(Category::Diaria)),
    Rule::contains("minha situacao", Command::MyStatus),
    Rule {
        pattern: Pattern::Prefix(CLEAR_PREFIX),
        outcome: Outcome::ClearTarget,
    },
    Rule::exact("ajuda", Command::Help),
    Rule::exact("help", Command::Help),
    Rule::exact("menu", Command::Help),
];

/// Keywords searched in the text after `limpar `, in order.
const CLEAR_TARGETS: [(&str, Category); 3] = [
    ("mensal", Category::Mensalidade),
    ("churras", Category::Churrasco),
    ("diaria", Category::Diaria),
];

/// Maps a normalized token to its command.
#[must_use]
pub fn classify(token: &str) -> Command {
    let Some(rule) = RULES.iter().find(|rule| rule.pattern.matches(token)) else {
        return Command::NoOp;
    };
    match rule.outcome {
        Outcome::Fixed(command) => command,
        Outcome::ClearTarget => clear_target(token),
    }
}

fn clear_target(token: &str) -> Command {
    let rest = token.strip_prefix(CLEAR_PREFIX).unwrap_or(token).trim();
    CLEAR_TARGETS
        .iter()
        .find(|(keyword, _)| rest.contains(*keyword))
        .map_or(Command::ClearUsage, |(_, category)| {
            Command::ClearCategory(*category)
        })
}
