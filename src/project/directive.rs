//! Directive keywords of the `proj.bscf` language

use std::collections::HashMap;

/// A directive keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Target,
    Include,
    GitInclude,
    Builtin,
    Depend,
    Prebuild,
    Postbuild,
    Define,
    Lib,
    IncDir,
    If,
    EndIf,
    AllowSkip,
}

/// Keyword to directive mapping, built once and owned by a parser
#[derive(Debug, Clone)]
pub struct DirectiveTable {
    keywords: HashMap<&'static str, Directive>,
}

impl Default for DirectiveTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl DirectiveTable {
    /// The full `proj.bscf` directive set
    pub fn standard() -> Self {
        let keywords = [
            ("TARGET", Directive::Target),
            ("INCLUDE", Directive::Include),
            ("GITINCLUDE", Directive::GitInclude),
            ("BUILTIN", Directive::Builtin),
            ("DEPEND", Directive::Depend),
            ("PREBUILD", Directive::Prebuild),
            ("POSTBUILD", Directive::Postbuild),
            ("DEFINE", Directive::Define),
            ("LIB", Directive::Lib),
            ("INCDIR", Directive::IncDir),
            ("IF", Directive::If),
            ("ENDIF", Directive::EndIf),
            ("ALLOWSKIP", Directive::AllowSkip),
        ]
        .into_iter()
        .collect();

        Self { keywords }
    }

    pub fn lookup(&self, keyword: &str) -> Option<Directive> {
        self.keywords.get(keyword).copied()
    }
}
