//! Per-language node tables.

use histmine_core::Language;

/// How methods, branches and calls look in one tree-sitter grammar.
pub struct Grammar {
    pub language: Language,
    load: fn() -> tree_sitter::Language,
    /// Nodes that define a function or method.
    pub functions: &'static [&'static str],
    /// Named types or modules that qualify the methods inside them.
    pub containers: &'static [&'static str],
    /// Nodes and operator tokens that add a branch.
    pub decisions: &'static [&'static str],
    /// Call sites, with the field naming the callee.
    pub calls: &'static [(&'static str, &'static str)],
    pub comments: &'static [&'static str],
    /// Separator between container and method names.
    pub separator: &'static str,
}

impl Grammar {
    /// Grammar for a detected language, if one is bundled.
    pub fn for_language(language: Language) -> Option<&'static Grammar> {
        match language {
            Language::Rust => Some(&RUST),
            Language::Python => Some(&PYTHON),
            Language::TypeScript | Language::JavaScript => Some(&TYPESCRIPT),
            Language::Tsx => Some(&TSX),
            Language::Go => Some(&GO),
            Language::Java => Some(&JAVA),
            Language::Unknown => None,
        }
    }

    pub fn ts_language(&self) -> tree_sitter::Language {
        (self.load)()
    }

    pub fn is_function(&self, kind: &str) -> bool {
        self.functions.contains(&kind)
    }

    pub fn is_container(&self, kind: &str) -> bool {
        self.containers.contains(&kind)
    }

    pub fn is_decision(&self, kind: &str) -> bool {
        self.decisions.contains(&kind)
    }

    pub fn is_comment(&self, kind: &str) -> bool {
        self.comments.contains(&kind)
    }

    /// Callee field of a call node.
    pub fn callee_field(&self, kind: &str) -> Option<&'static str> {
        self.calls
            .iter()
            .find(|(call, _)| *call == kind)
            .map(|(_, field)| *field)
    }
}

fn rust() -> tree_sitter::Language {
    tree_sitter_rust::LANGUAGE.into()
}

fn python() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}

fn typescript() -> tree_sitter::Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

fn tsx() -> tree_sitter::Language {
    tree_sitter_typescript::LANGUAGE_TSX.into()
}

fn go() -> tree_sitter::Language {
    tree_sitter_go::LANGUAGE.into()
}

fn java() -> tree_sitter::Language {
    tree_sitter_java::LANGUAGE.into()
}

static RUST: Grammar = Grammar {
    language: Language::Rust,
    load: rust,
    functions: &["function_item"],
    containers: &["impl_item", "trait_item", "mod_item"],
    decisions: &[
        "if_expression",
        "while_expression",
        "for_expression",
        "match_arm",
        "&&",
        "||",
    ],
    calls: &[("call_expression", "function")],
    comments: &["line_comment", "block_comment"],
    separator: "::",
};

static PYTHON: Grammar = Grammar {
    language: Language::Python,
    load: python,
    functions: &["function_definition"],
    containers: &["class_definition"],
    decisions: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "conditional_expression",
        "case_clause",
        "and",
        "or",
    ],
    calls: &[("call", "function")],
    comments: &["comment"],
    separator: ".",
};

const JS_FUNCTIONS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
];
const JS_CONTAINERS: &[&str] = &["class_declaration", "class", "abstract_class_declaration"];
const JS_DECISIONS: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "catch_clause",
    "ternary_expression",
    "&&",
    "||",
    "??",
];
const JS_CALLS: &[(&str, &str)] = &[("call_expression", "function"), ("new_expression", "constructor")];

static TYPESCRIPT: Grammar = Grammar {
    language: Language::TypeScript,
    load: typescript,
    functions: JS_FUNCTIONS,
    containers: JS_CONTAINERS,
    decisions: JS_DECISIONS,
    calls: JS_CALLS,
    comments: &["comment"],
    separator: ".",
};

static TSX: Grammar = Grammar {
    language: Language::Tsx,
    load: tsx,
    functions: JS_FUNCTIONS,
    containers: JS_CONTAINERS,
    decisions: JS_DECISIONS,
    calls: JS_CALLS,
    comments: &["comment"],
    separator: ".",
};

static GO: Grammar = Grammar {
    language: Language::Go,
    load: go,
    functions: &["function_declaration", "method_declaration"],
    containers: &[],
    decisions: &[
        "if_statement",
        "for_statement",
        "expression_case",
        "type_case",
        "communication_case",
        "&&",
        "||",
    ],
    calls: &[("call_expression", "function")],
    comments: &["comment"],
    separator: ".",
};

static JAVA: Grammar = Grammar {
    language: Language::Java,
    load: java,
    functions: &["method_declaration", "constructor_declaration"],
    containers: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
    ],
    decisions: &[
        "if_statement",
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
        "switch_label",
        "catch_clause",
        "ternary_expression",
        "&&",
        "||",
    ],
    calls: &[("method_invocation", "name"), ("object_creation_expression", "type")],
    comments: &["line_comment", "block_comment"],
    separator: ".",
};
