//! Language detection and per-language chunking parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

const GENERIC: &[&str] = &["\n\n", "\n", " ", ""];

const PYTHON: &[&str] = &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " ", ""];

const JAVASCRIPT: &[&str] = &[
    "\nfunction ", "\nconst ", "\nlet ", "\nvar ", "\nclass ", "\nif ", "\nfor ", "\nwhile ",
    "\nswitch ", "\ncase ", "\ndefault ", "\n\n", "\n", " ", "",
];

const TYPESCRIPT: &[&str] = &[
    "\nenum ", "\ninterface ", "\nnamespace ", "\ntype ", "\nclass ", "\nfunction ", "\nconst ",
    "\nlet ", "\nvar ", "\nif ", "\nfor ", "\nwhile ", "\nswitch ", "\ncase ", "\ndefault ",
    "\n\n", "\n", " ", "",
];

const JAVA: &[&str] = &[
    "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nif ", "\nfor ",
    "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
];

const C_FAMILY: &[&str] = &[
    "\nclass ", "\nvoid ", "\nint ", "\nfloat ", "\ndouble ", "\nif ", "\nfor ", "\nwhile ",
    "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
];

const GO: &[&str] = &[
    "\nfunc ", "\nvar ", "\nconst ", "\ntype ", "\nif ", "\nfor ", "\nswitch ", "\ncase ", "\n\n",
    "\n", " ", "",
];

const RUBY: &[&str] = &[
    "\ndef ", "\nclass ", "\nif ", "\nunless ", "\nwhile ", "\nfor ", "\ndo ", "\nbegin ",
    "\nrescue ", "\n\n", "\n", " ", "",
];

const RUST: &[&str] = &[
    "\nfn ", "\npub fn ", "\nimpl ", "\nstruct ", "\nenum ", "\ntrait ", "\nconst ", "\nlet ",
    "\nif ", "\nwhile ", "\nfor ", "\nloop ", "\nmatch ", "\n\n", "\n", " ", "",
];

const PHP: &[&str] = &[
    "\nfunction ", "\nclass ", "\nif ", "\nforeach ", "\nwhile ", "\ndo ", "\nswitch ", "\ncase ",
    "\n\n", "\n", " ", "",
];

const PROTO: &[&str] = &[
    "\npackage ", "\nmessage ", "\nservice ", "\nenum ", "\noption ", "\nimport ", "\nsyntax ",
    "\n\n", "\n", " ", "",
];

const RST: &[&str] = &["\n===", "\n---", "\n***", "\n.. ", "\n\n", "\n", " ", ""];

const SCALA: &[&str] = &[
    "\nclass ", "\nobject ", "\ndef ", "\nval ", "\nvar ", "\nif ", "\nfor ", "\nwhile ",
    "\nmatch ", "\ncase ", "\n\n", "\n", " ", "",
];

const MARKDOWN: &[&str] = &[
    "\n# ", "\n## ", "\n### ", "\n#### ", "\n##### ", "\n###### ", "```\n", "\n***\n",
    "\n---\n", "\n___\n", "\n\n", "\n", " ", "",
];

const LATEX: &[&str] = &[
    "\n\\chapter{",
    "\n\\section{",
    "\n\\subsection{",
    "\n\\subsubsection{",
    "\n\\begin{enumerate}",
    "\n\\begin{itemize}",
    "\n\\begin{description}",
    "\n\\begin{list}",
    "\n\\begin{quote}",
    "\n\\begin{quotation}",
    "\n\\begin{verse}",
    "\n\\begin{verbatim}",
    "\n\\begin{align}",
    "$$",
    "$",
    " ",
    "",
];

const HTML: &[&str] = &[
    "<body", "<div", "<p", "<br", "<li", "<h1", "<h2", "<h3", "<h4", "<h5", "<h6", "<span",
    "<table", "<tr", "<td", "<th", "<ul", "<ol", "<header", "<footer", "<nav", "<head", "<style",
    "<script", "<meta", "<title", "",
];

const SOLIDITY: &[&str] = &[
    "\npragma ", "\nusing ", "\ncontract ", "\ninterface ", "\nlibrary ", "\nconstructor ",
    "\ntype ", "\nfunction ", "\nevent ", "\nmodifier ", "\nerror ", "\nstruct ", "\nenum ",
    "\nif ", "\nfor ", "\nwhile ", "\ndo while ", "\nassembly ", "\n\n", "\n", " ", "",
];

const CSHARP: &[&str] = &[
    "\ninterface ", "\nenum ", "\nimplements ", "\ndelegate ", "\nevent ", "\nclass ",
    "\nabstract ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nreturn ", "\nif ",
    "\ncontinue ", "\nfor ", "\nforeach ", "\nwhile ", "\nswitch ", "\nbreak ", "\ncase ",
    "\nelse ", "\ntry ", "\nthrow ", "\nfinally ", "\ncatch ", "\n\n", "\n", " ", "",
];

const COBOL: &[&str] = &[
    "\nIDENTIFICATION DIVISION.",
    "\nENVIRONMENT DIVISION.",
    "\nDATA DIVISION.",
    "\nPROCEDURE DIVISION.",
    "\nWORKING-STORAGE SECTION.",
    "\nLINKAGE SECTION.",
    "\nFILE SECTION.",
    "\nINPUT-OUTPUT SECTION.",
    "\nOPEN ",
    "\nCLOSE ",
    "\nREAD ",
    "\nWRITE ",
    "\nIF ",
    "\nELSE ",
    "\nMOVE ",
    "\nPERFORM ",
    "\nUNTIL ",
    "\nVARYING ",
    "\nACCEPT ",
    "\nDISPLAY ",
    "\nSTOP RUN.",
    "\n",
    " ",
    "",
];

const LUA: &[&str] = &[
    "\nlocal ", "\nfunction ", "\nif ", "\nfor ", "\nwhile ", "\nrepeat ", "\n\n", "\n", " ", "",
];

const PERL: &[&str] = &[
    "\nsub ", "\npackage ", "\nuse ", "\nif ", "\nunless ", "\nforeach ", "\nwhile ", "\n\n",
    "\n", " ", "",
];

const ELIXIR: &[&str] = &[
    "\ndef ", "\ndefp ", "\ndefmodule ", "\ndefprotocol ", "\ndefmacro ", "\ndefmacrop ", "\nif ",
    "\nunless ", "\nwhile ", "\ncase ", "\ncond ", "\nwith ", "\nfor ", "\ndo ", "\n\n", "\n",
    " ", "",
];

/// Languages with dedicated splitting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
    C,
    Go,
    Ruby,
    Rust,
    Php,
    Proto,
    Rst,
    Scala,
    Markdown,
    Latex,
    Html,
    Solidity,
    CSharp,
    Cobol,
    Lua,
    Perl,
    Elixir,
    Unknown,
}

impl Lang {
    /// Map a file extension (with or without the dot, any case).
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "py" => Self::Python,
            "js" | "jsx" | "mjs" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "java" => Self::Java,
            "cpp" | "hpp" | "cc" | "cxx" | "hxx" => Self::Cpp,
            "c" | "h" => Self::C,
            "go" => Self::Go,
            "rb" | "rake" | "gemspec" => Self::Ruby,
            "rs" => Self::Rust,
            "php" => Self::Php,
            "proto" => Self::Proto,
            "rst" => Self::Rst,
            "scala" => Self::Scala,
            "md" | "markdown" => Self::Markdown,
            "tex" => Self::Latex,
            "html" | "htm" => Self::Html,
            "sol" => Self::Solidity,
            "cs" => Self::CSharp,
            "cob" | "cbl" => Self::Cobol,
            "lua" => Self::Lua,
            "pl" | "pm" => Self::Perl,
            "ex" | "exs" => Self::Elixir,
            _ => Self::Unknown,
        }
    }

    /// Identifier stored in chunk metadata and used in prompts.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Go => "go",
            Self::Ruby => "ruby",
            Self::Rust => "rust",
            Self::Php => "php",
            Self::Proto => "proto",
            Self::Rst => "rst",
            Self::Scala => "scala",
            Self::Markdown => "markdown",
            Self::Latex => "latex",
            Self::Html => "html",
            Self::Solidity => "solidity",
            Self::CSharp => "csharp",
            Self::Cobol => "cobol",
            Self::Lua => "lua",
            Self::Perl => "perl",
            Self::Elixir => "elixir",
            Self::Unknown => "unknown",
        }
    }

    /// `(chunk_size, chunk_overlap)` in characters.
    #[must_use]
    pub fn chunk_params(self) -> (usize, usize) {
        match self {
            Self::Java | Self::Cpp | Self::CSharp | Self::Go | Self::Rust => (1500, 300),
            Self::Html | Self::Markdown | Self::Rst | Self::Latex => (800, 150),
            Self::Proto => (600, 100),
            _ => (1000, 200),
        }
    }

    /// Split boundaries, coarsest first, ending with the character fallback.
    #[must_use]
    pub fn separators(self) -> &'static [&'static str] {
        match self {
            Self::Python => PYTHON,
            Self::JavaScript => JAVASCRIPT,
            Self::TypeScript => TYPESCRIPT,
            Self::Java => JAVA,
            Self::Cpp | Self::C => C_FAMILY,
            Self::Go => GO,
            Self::Ruby => RUBY,
            Self::Rust => RUST,
            Self::Php => PHP,
            Self::Proto => PROTO,
            Self::Rst => RST,
            Self::Scala => SCALA,
            Self::Markdown => MARKDOWN,
            Self::Latex => LATEX,
            Self::Html => HTML,
            Self::Solidity => SOLIDITY,
            Self::CSharp => CSHARP,
            Self::Cobol => COBOL,
            Self::Lua => LUA,
            Self::Perl => PERL,
            Self::Elixir => ELIXIR,
            Self::Unknown => GENERIC,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
