//! Code-block language normalization.
//!
//! Fenced code info strings use whatever short form the author likes (`py`, `sh`, `yml`); the
//! remote service accepts a closed list of identifiers and rejects the block otherwise.

/// Language assigned to code blocks that declare none.
pub const PLAIN_TEXT: &str = "plain text";

/// Languages the remote service accepts, lowercase.
const SUPPORTED: &[&str] = &[
    "abap",
    "agda",
    "arduino",
    "ascii art",
    "assembly",
    "bash",
    "basic",
    "bnf",
    "c",
    "c#",
    "c++",
    "clojure",
    "coffeescript",
    "coq",
    "css",
    "dart",
    "dhall",
    "diff",
    "docker",
    "ebnf",
    "elixir",
    "elm",
    "erlang",
    "f#",
    "flow",
    "fortran",
    "gherkin",
    "glsl",
    "go",
    "graphql",
    "groovy",
    "haskell",
    "hcl",
    "html",
    "idris",
    "java",
    "javascript",
    "json",
    "julia",
    "kotlin",
    "latex",
    "less",
    "lisp",
    "livescript",
    "llvm ir",
    "lua",
    "makefile",
    "markdown",
    "markup",
    "matlab",
    "mathematica",
    "mermaid",
    "nix",
    "notion formula",
    "objective-c",
    "ocaml",
    "pascal",
    "perl",
    "php",
    "plain text",
    "powershell",
    "prolog",
    "protobuf",
    "purescript",
    "python",
    "r",
    "racket",
    "reason",
    "ruby",
    "rust",
    "sass",
    "scala",
    "scheme",
    "scss",
    "shell",
    "smalltalk",
    "solidity",
    "sql",
    "swift",
    "toml",
    "typescript",
    "vb.net",
    "verilog",
    "vhdl",
    "visual basic",
    "webassembly",
    "xml",
    "yaml",
];

/// Short forms mapped to the identifier the service expects.
fn alias(lang: &str) -> Option<&'static str> {
    let mapped = match lang {
        "py" | "python3" | "py3" => "python",
        "sh" | "zsh" | "console" | "shell-session" => "shell",
        "yml" => "yaml",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" | "node" => "javascript",
        "cpp" | "cxx" | "cc" | "hpp" => "c++",
        "cs" | "csharp" => "c#",
        "fs" | "fsharp" => "f#",
        "rb" => "ruby",
        "rs" => "rust",
        "kt" | "kts" => "kotlin",
        "md" => "markdown",
        "golang" => "go",
        "hs" => "haskell",
        "ex" | "exs" => "elixir",
        "erl" => "erlang",
        "objc" | "obj-c" => "objective-c",
        "ps" | "ps1" | "pwsh" => "powershell",
        "tex" => "latex",
        "dockerfile" => "docker",
        "make" | "mk" => "makefile",
        "proto" => "protobuf",
        "gql" => "graphql",
        "mmd" => "mermaid",
        "tf" => "hcl",
        "wasm" | "wat" => "webassembly",
        "vb" => "visual basic",
        "text" | "txt" | "plaintext" | "plain" => PLAIN_TEXT,
        "htm" | "xhtml" => "html",
        "asm" => "assembly",
        "ml" => "ocaml",
        "pl" => "perl",
        "clj" => "clojure",
        "patch" => "diff",
        _ => return None,
    };
    Some(mapped)
}

/// Map a declared language onto the identifier the service accepts.
///
/// Known short forms are translated, identifiers that only differ from a supported one by case
/// are lowercased, and anything else is returned unchanged.
pub fn normalize(lang: &str) -> String {
    let lowered = lang.trim().to_ascii_lowercase();
    if let Some(mapped) = alias(&lowered) {
        return mapped.to_string();
    }
    if SUPPORTED.contains(&lowered.as_str()) {
        return lowered;
    }
    lang.to_string()
}

/// Whether `lang` is accepted by the service as-is.
pub fn is_supported(lang: &str) -> bool {
    SUPPORTED.contains(&lang)
}
