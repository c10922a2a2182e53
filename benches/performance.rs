use pure_wysiwyg::{
    editor::{Direction, DocumentEditor, KeyEvent, ListKind},
    interop, markup, render,
    theme::Theme,
};
use std::time::{Duration, Instant};
use tdoc::{Document, InlineStyle, Paragraph, ParagraphType, Span};

/// Performance benchmark suite for the editing kernel
///
/// Run with: cargo test --release --bench performance -- --nocapture
///
/// This measures:
/// - Rendering the tree for the terminal
/// - Typing and deleting with the keyboard state machine
/// - Formatting and list commands over a selection
/// - Markup parsing and serialization
const SMALL_DOC_PARAGRAPHS: usize = 10;
const MEDIUM_DOC_PARAGRAPHS: usize = 100;
const LARGE_DOC_PARAGRAPHS: usize = 1000;

const ITERATIONS: usize = 100;

const SAMPLE_WORDS: &[&str] = &[
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];

/// Create a test document with the specified number of paragraphs
fn create_test_document(num_paragraphs: usize, avg_words_per_para: usize) -> Document {
    let mut doc = Document::new();

    for i in 0..num_paragraphs {
        let paragraph_type = match i % 5 {
            0 => ParagraphType::Header1,
            1 => ParagraphType::Header2,
            2 => ParagraphType::Header3,
            3 => ParagraphType::CodeBlock,
            _ => ParagraphType::Text,
        };

        let mut text = String::new();
        for j in 0..avg_words_per_para {
            if j > 0 {
                text.push(' ');
            }
            text.push_str(SAMPLE_WORDS[j % SAMPLE_WORDS.len()]);
        }

        let paragraph = Paragraph::new(paragraph_type).with_content(vec![Span::new_text(&text)]);
        doc.add_paragraph(paragraph);
    }

    doc
}

/// Create a document with mixed inline styles
fn create_styled_document(num_paragraphs: usize) -> Document {
    let mut doc = Document::new();

    for i in 0..num_paragraphs {
        let text = format!(
            "This is paragraph {} with some bold and italic text and maybe some code.",
            i
        );

        let span = if i % 15 == 0 {
            Span::new_styled(InlineStyle::Bold)
                .with_children(vec![Span::new_styled(InlineStyle::Italic).with_text(&text)])
        } else if i % 3 == 0 {
            Span::new_styled(InlineStyle::Bold).with_text(&text)
        } else if i % 5 == 0 {
            Span::new_styled(InlineStyle::Italic).with_text(&text)
        } else {
            Span::new_text(&text)
        };

        let paragraph = Paragraph::new_text().with_content(vec![span]);
        doc.add_paragraph(paragraph);
    }

    doc
}

fn editor_for(doc: &Document) -> DocumentEditor {
    DocumentEditor::new(interop::document_to_tree(doc))
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    total_duration: Duration,
    avg_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(70));
        println!("Iterations:     {}", self.iterations);
        println!("Total time:     {:?}", self.total_duration);
        println!("Average:        {:?}", self.avg_duration);
        println!("Min:            {:?}", self.min_duration);
        println!("Max:            {:?}", self.max_duration);
        println!(
            "Ops/sec:        {:.2}",
            1_000_000.0 / self.avg_duration.as_micros().max(1) as f64
        );

        if self.avg_duration.as_millis() > 100 {
            println!("\n⚠️  WARNING: Average duration > 100ms (user-perceptible lag)");
        } else if self.avg_duration.as_millis() > 16 {
            println!("\n⚠️  WARNING: Average duration > 16ms (may drop frames)");
        }
    }
}

fn benchmark<F>(name: &str, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut(),
{
    let mut durations = Vec::with_capacity(iterations);

    // Warmup
    for _ in 0..10 {
        f();
    }

    for _ in 0..iterations {
        let start = Instant::now();
        f();
        durations.push(start.elapsed());
    }

    let total_duration: Duration = durations.iter().sum();
    let avg_duration = total_duration / iterations as u32;
    let min_duration = *durations.iter().min().unwrap();
    let max_duration = *durations.iter().max().unwrap();

    BenchmarkResult {
        name: name.to_string(),
        iterations,
        total_duration,
        avg_duration,
        min_duration,
        max_duration,
    }
}

fn sized_documents(build: fn(usize) -> Document) -> Vec<(&'static str, Document)> {
    vec![
        ("Small (10 paras)", build(SMALL_DOC_PARAGRAPHS)),
        ("Medium (100 paras)", build(MEDIUM_DOC_PARAGRAPHS)),
        ("Large (1000 paras)", build(LARGE_DOC_PARAGRAPHS)),
    ]
}

fn plain_document(num_paragraphs: usize) -> Document {
    create_test_document(num_paragraphs, 20)
}

#[test]
fn bench_rendering_performance() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           RENDERING PERFORMANCE BENCHMARKS                     ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let theme = Theme::default();
    for (name, doc) in sized_documents(plain_document) {
        let editor = editor_for(&doc);
        let result = benchmark(&format!("render_tree - {}", name), ITERATIONS, || {
            let _ = render::render_tree(editor.tree(), Some(editor.range()), 80, &theme);
        });
        result.print();
    }

    for (name, doc) in sized_documents(create_styled_document) {
        let editor = editor_for(&doc);
        let result = benchmark(&format!("render_tree styled - {}", name), ITERATIONS, || {
            let _ = render::render_tree(editor.tree(), Some(editor.range()), 80, &theme);
        });
        result.print();
    }
}

#[test]
fn bench_typing() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           TYPING BENCHMARKS                                    ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, doc) in sized_documents(plain_document) {
        let mut editor = editor_for(&doc);
        let result = benchmark(&format!("insert_char - {}", name), ITERATIONS, || {
            editor.handle_key(KeyEvent::Char('x'));
        });
        result.print();

        let result = benchmark(&format!("backspace - {}", name), ITERATIONS, || {
            editor.handle_key(KeyEvent::Backspace);
        });
        result.print();

        let result = benchmark(&format!("enter + backspace - {}", name), ITERATIONS, || {
            editor.handle_key(KeyEvent::Enter);
            editor.handle_key(KeyEvent::Backspace);
        });
        result.print();

        println!("\n💡 NOTE: These operations run on EVERY keystroke!");
    }
}

#[test]
fn bench_caret_movement() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           CARET MOVEMENT BENCHMARKS                            ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, doc) in sized_documents(create_styled_document) {
        let mut editor = editor_for(&doc);
        let result = benchmark(&format!("move_caret right - {}", name), ITERATIONS, || {
            editor.move_caret(Direction::Next, false);
        });
        result.print();

        let result = benchmark(&format!("move_caret down - {}", name), ITERATIONS, || {
            editor.move_caret_vertically(Direction::Next, false);
        });
        result.print();
    }
}

#[test]
fn bench_selection_commands() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           SELECTION COMMAND BENCHMARKS                         ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, doc) in sized_documents(create_styled_document) {
        let base = editor_for(&doc);
        let iterations = if name.contains("Large") { 10 } else { ITERATIONS };

        let result = benchmark(&format!("toggle bold on all - {}", name), iterations, || {
            let mut editor = base.clone();
            editor.select_all();
            editor.toggle_format("b");
        });
        result.print();

        let result = benchmark(&format!("toggle list on all - {}", name), iterations, || {
            let mut editor = base.clone();
            editor.select_all();
            editor.toggle_list(ListKind::Unordered);
        });
        result.print();

        let result = benchmark(&format!("delete all - {}", name), iterations, || {
            let mut editor = base.clone();
            editor.select_all();
            editor.handle_key(KeyEvent::Backspace);
        });
        result.print();
    }
}

#[test]
fn bench_markup() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           MARKUP BENCHMARKS                                    ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let void_tags = pure_wysiwyg::editor::options::DEFAULT_VOID_TAGS;
    for (name, doc) in sized_documents(create_styled_document) {
        let editor = editor_for(&doc);
        let source = editor.to_markup();

        let result = benchmark(&format!("markup::parse - {}", name), ITERATIONS, || {
            let _ = markup::parse(&source, void_tags);
        });
        result.print();

        let result = benchmark(&format!("markup::serialize - {}", name), ITERATIONS, || {
            let _ = markup::serialize(editor.tree(), Some(editor.range()));
        });
        result.print();

        let result = benchmark(&format!("tree_to_document - {}", name), ITERATIONS, || {
            let _ = interop::tree_to_document(editor.tree());
        });
        result.print();
    }
}
