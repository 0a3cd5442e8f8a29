//! End-to-end analysis of small C functions.

use bound_sentinel::{analyze_unit, parse_source, Analysis, AnalyzerConfig};

fn analyze(source: &str) -> Analysis {
    let mut unit = parse_source("scenario.c", source.to_string()).expect("source should parse");
    analyze_unit(&mut unit, &AnalyzerConfig::default())
}

fn ids(analysis: &Analysis) -> Vec<&str> {
    analysis
        .suggestions
        .iter()
        .map(|suggestion| suggestion.check_id.as_str())
        .collect()
}

#[test]
fn constant_subscript_past_the_end() {
    let analysis = analyze("void last(void)\n{\n    char buf[10];\n    buf[10] = 'x';\n}\n");

    assert_eq!(ids(&analysis), ["B001"]);
    let suggestion = &analysis.suggestions[0];
    assert_eq!(suggestion.function_name, "last");
    assert_eq!(suggestion.relative_line, 4);
    assert_eq!(suggestion.source_line, 4);
    assert!(suggestion.patched_source.contains("buf[9] = 'x';"));
    assert!(suggestion.patched_source.starts_with("void last(void)"));
}

#[test]
fn inclusive_loop_bound_gets_paired_fixes() {
    let analysis = analyze(
        "void fill(void)\n{\n    char buf[10];\n    for (int i = 0; i <= 10; i++)\n        buf[i] = 0;\n}\n",
    );

    assert_eq!(ids(&analysis), ["B002", "B002"]);
    assert!(analysis.suggestions[0].patched_source.contains("char buf[11];"));
    assert!(analysis.suggestions[1].patched_source.contains("i < 10"));
    assert!(analysis.suggestions[0].description.contains("at least 11"));
}

#[test]
fn copy_length_larger_than_heap_buffer() {
    let analysis = analyze(
        "void copy(void)\n{\n    char src[8];\n    char *p = malloc(5);\n    memcpy(p, src, 8);\n}\n",
    );

    assert_eq!(ids(&analysis), ["B007", "B007"]);
    assert!(analysis.suggestions[0].patched_source.contains("memcpy(p, src, 5);"));
    assert!(analysis.suggestions[1].patched_source.contains("malloc(8)"));
}

#[test]
fn string_copy_from_larger_array() {
    let analysis = analyze(
        "void copy(void)\n{\n    char small[4];\n    char big[8];\n    strcpy(small, big);\n}\n",
    );

    assert_eq!(ids(&analysis), ["B008"]);
    assert!(analysis.suggestions[0].patched_source.contains("char small[8];"));
}

#[test]
fn parameter_index_without_bound_check() {
    let analysis = analyze("void f(int idx)\n{\n    char buf[10];\n    buf[idx] = 1;\n}\n");

    assert_eq!(ids(&analysis), ["B004"]);
    let suggestion = &analysis.suggestions[0];
    assert!(suggestion.description.contains("No bound check performed on index `idx`"));
    assert!(suggestion.patched_source.contains("if (idx >= 0 && idx < 10)"));
}

#[test]
fn guarded_index_is_silent_only_inside_the_guard() {
    let analysis = analyze(
        "void f(int idx)\n{\n    char buf[10];\n    if (idx >= 0 && idx < 10) {\n        buf[idx] = 1;\n    }\n    buf[idx] = 2;\n}\n",
    );

    assert_eq!(ids(&analysis), ["B004"]);
    assert_eq!(analysis.suggestions[0].relative_line, 7);
}

#[test]
fn half_checked_index_reports_missing_side() {
    let analysis = analyze(
        "void f(int idx)\n{\n    char buf[10];\n    if (idx < 10) {\n        buf[idx] = 1;\n    }\n}\n",
    );

    assert_eq!(ids(&analysis), ["B005"]);
}

#[test]
fn unknown_struct_size_falls_back_to_one_and_notes_it() {
    let analysis = analyze(
        "void f(void)\n{\n    struct record *items = malloc(4 * sizeof(struct record));\n    items[2].a = 1;\n}\n",
    );

    assert!(analysis.suggestions.is_empty());
    assert!(analysis
        .diagnostics
        .iter()
        .any(|diagnostic| diagnostic.message.contains("defaulting to 1")));
}

#[test]
fn scanf_string_without_width() {
    let analysis = analyze(
        "void read_name(void)\n{\n    char name[8];\n    scanf(\"%s\", name);\n}\n",
    );

    assert_eq!(ids(&analysis), ["B009"]);
    assert!(analysis.suggestions[0].patched_source.contains("scanf(\"%7s\", name);"));
}

#[test]
fn gets_is_rewritten_to_fgets() {
    let analysis = analyze("void read_line(void)\n{\n    char line[16];\n    gets(line);\n}\n");

    assert_eq!(ids(&analysis), ["B010"]);
    assert!(analysis.suggestions[0]
        .patched_source
        .contains("fgets(line, 16, stdin);"));
}

#[test]
fn analysis_is_repeatable_on_the_same_tree() {
    let source = "void f(int idx)\n{\n    char buf[10];\n    for (int i = 0; i <= 10; i++)\n        buf[i] = 0;\n    buf[idx] = 1;\n    buf[12] = 0;\n}\n";
    let mut unit = parse_source("scenario.c", source.to_string()).expect("source should parse");

    let first = analyze_unit(&mut unit, &AnalyzerConfig::default());
    let second = analyze_unit(&mut unit, &AnalyzerConfig::default());

    assert_eq!(first, second);
    assert_eq!(first.suggestions.len(), 4);
}

#[test]
fn functions_are_analyzed_independently() {
    let analysis = analyze(
        "void a(void)\n{\n    char buf[4];\n    buf[4] = 0;\n}\n\nvoid b(void)\n{\n    char buf[8];\n    buf[4] = 0;\n}\n",
    );

    assert_eq!(ids(&analysis), ["B001"]);
    assert_eq!(analysis.suggestions[0].function_name, "a");
    assert!(!analysis.suggestions[0].patched_source.contains("void b"));
}

#[test]
fn huge_variable_index_only_offers_the_clamp() {
    let analysis = analyze(
        "void f(void)\n{\n    int v[4];\n    long k = 0x2000000000000000;\n    v[k] = 1;\n}\n",
    );

    assert_eq!(ids(&analysis), ["B003"]);
    assert!(analysis.suggestions[0].patched_source.contains("long k = 3;"));
}

#[test]
fn loop_bound_at_i64_max_only_offers_the_shrink() {
    let analysis = analyze(
        "void f(void)\n{\n    char b[4];\n    for (long i = 0; i <= 0x7fffffffffffffff; i++)\n        b[i] = 0;\n}\n",
    );

    assert_eq!(ids(&analysis), ["B002"]);
    assert!(analysis.suggestions[0].patched_source.contains("i < 4"));
}

#[test]
fn loop_bound_at_i64_min_is_ignored() {
    let analysis = analyze(
        "void f(void)\n{\n    char b[4];\n    for (long i = 0; i < -9223372036854775807 - 1; i++)\n        b[i] = 0;\n}\n",
    );

    assert!(analysis.suggestions.is_empty());
}

#[test]
fn copy_length_near_i64_max_only_offers_the_shrink() {
    let analysis = analyze(
        "void f(const char *s)\n{\n    int *p = malloc(4 * sizeof(int));\n    memcpy(p, s, 0x7ffffffffffffffe);\n}\n",
    );

    assert_eq!(ids(&analysis), ["B007"]);
    assert!(analysis.suggestions[0].patched_source.contains("memcpy(p, s, 16);"));
}

#[test]
fn zero_length_array_is_only_grown() {
    let analysis = analyze(
        "void f(int idx)\n{\n    char b[0];\n    b[1] = 0;\n    for (int i = 0; i < 4; i++)\n        b[i] = 0;\n    b[idx] = 0;\n}\n",
    );

    assert_eq!(ids(&analysis), ["B001", "B002"]);
    assert!(analysis.suggestions[0].patched_source.contains("char b[2];"));
    assert!(analysis.suggestions[0].patched_source.contains("b[1] = 0;"));
    assert!(analysis.suggestions[1].patched_source.contains("char b[4];"));
    assert!(analysis.suggestions[1].patched_source.contains("i < 4"));
    assert!(analysis
        .suggestions
        .iter()
        .all(|suggestion| !suggestion.description.contains("-1")));
}

#[test]
fn growth_through_assigned_alias_edits_the_original_array() {
    let analysis = analyze(
        "void f(void)\n{\n    char buf[8];\n    char *p;\n    p = buf;\n    for (int i = 0; i <= 8; i++)\n        p[i] = 0;\n}\n",
    );

    assert_eq!(ids(&analysis), ["B002", "B002"]);
    assert!(analysis.suggestions[0].patched_source.contains("char buf[9];"));
    assert!(analysis.suggestions[0].description.contains("`p`"));
    assert_eq!(analysis.suggestions[0].relative_line, 3);
    assert!(analysis.suggestions[1].patched_source.contains("i < 8"));
}

#[test]
fn copy_through_assigned_alias_checks_the_original_array() {
    let analysis = analyze(
        "void f(void)\n{\n    char buf[8];\n    char src[12];\n    char *p;\n    p = buf;\n    memcpy(p, src, 12);\n}\n",
    );

    assert_eq!(ids(&analysis), ["B007", "B007"]);
    assert!(analysis.suggestions[0].patched_source.contains("memcpy(p, src, 8);"));
    assert!(analysis.suggestions[1].patched_source.contains("char buf[12];"));
}

#[test]
fn wide_fill_counts_wchar_units() {
    let analysis = analyze(
        "void f(void)\n{\n    wchar_t w[4];\n    wmemset(w, L'x', 8);\n}\n",
    );

    assert_eq!(ids(&analysis), ["B007", "B007"]);
    assert!(analysis.suggestions[0].patched_source.contains("wmemset(w, L'x', 4);"));
    assert!(analysis.suggestions[1].patched_source.contains("wchar_t w[8];"));
}

#[test]
fn wide_bounded_copy_counts_wchar_units() {
    let analysis = analyze(
        "void f(void)\n{\n    wchar_t d[4];\n    wchar_t s[10];\n    wcsncpy(d, s, 10);\n}\n",
    );

    assert_eq!(ids(&analysis), ["B007", "B007"]);
    assert!(analysis.suggestions[0].patched_source.contains("wcsncpy(d, s, 4);"));
    assert!(analysis.suggestions[1].patched_source.contains("wchar_t d[10];"));
}

#[test]
fn calloc_capacity_multiplies_both_arguments() {
    let fits = analyze(
        "void f(void)\n{\n    int *p = calloc(5, sizeof(int));\n    memset(p, 0, 20);\n}\n",
    );
    assert!(fits.suggestions.is_empty());

    let analysis = analyze(
        "void f(void)\n{\n    int *p = calloc(5, sizeof(int));\n    memset(p, 0, 24);\n}\n",
    );
    assert_eq!(ids(&analysis), ["B007", "B007"]);
    assert!(analysis.suggestions[0].patched_source.contains("memset(p, 0, 20);"));
    assert!(analysis.suggestions[1].patched_source.contains("calloc(6, sizeof(int))"));
}
