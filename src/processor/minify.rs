//! Script and stylesheet minification.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Both return `None` on
//! a parse failure so callers can fall back to the original text.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, CompressOptionsUnused, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::core::ResourceType;

/// Minify `source` as the given resource type.
pub fn minify(kind: ResourceType, source: &str) -> Option<String> {
    match kind {
        ResourceType::Js => minify_js(source),
        ResourceType::Css => minify_css(source),
    }
}

/// Minify a classic (non-module) browser script.
///
/// Top-level declarations are globals other scripts on the page may use,
/// so they are neither renamed nor dropped as unused.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::script()).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        return None;
    }

    let mut program = parsed.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions {
            unused: CompressOptionsUnused::Keep,
            ..CompressOptions::smallest()
        }),
    };
    let minified = Minifier::new(options).minify(&allocator, &mut program);

    let output = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program);
    Some(output.code)
}

pub fn minify_css(source: &str) -> Option<String> {
    let sheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(printed.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_css() {
        let out = minify_css("body {\n  color: red;\n}\n").unwrap();
        assert_eq!(out, "body{color:red}");
    }

    #[test]
    fn test_minify_js_shrinks() {
        let src = "function add(first, second) {\n  // sum\n  return first + second;\n}\n";
        let out = minify_js(src).unwrap();
        assert!(out.len() < src.len());
        assert!(out.contains("add"));
        assert!(!out.contains("// sum"));
    }

    #[test]
    fn test_minify_js_keeps_globals() {
        let src = "function add(a, b) { return a + b; }\nvar counter = 1;\n";
        let out = minify_js(src).unwrap();
        assert!(out.contains("function add("), "{out}");
        assert!(out.contains("counter=1"), "{out}");
    }

    #[test]
    fn test_minify_js_shrinks_locals() {
        let src = "function scale(value) { var factor = 2; return value * factor; }";
        let out = minify_js(src).unwrap();
        assert!(out.contains("scale"));
        assert!(!out.contains("factor"), "{out}");
    }

    #[test]
    fn test_invalid_input_returns_none() {
        assert!(minify(ResourceType::Js, "function (").is_none());
        assert!(minify(ResourceType::Js, "let x = ;").is_none());
    }
}
