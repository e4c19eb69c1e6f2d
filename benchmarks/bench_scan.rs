use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use crashscan::analyzers::{PluginAnalyzer, SuspectScanner};
use crashscan::segments::find_segments;
use crashscan::version::Version;
use crashscan::RuleDatabase;

fn synthetic_log(stack_frames: usize, plugins: usize) -> Vec<String> {
    let mut lines = vec![
        "Fallout 4 v1.10.163".to_string(),
        "Buffout 4 v1.37.0".to_string(),
        String::new(),
        "Unhandled exception \"EXCEPTION_ACCESS_VIOLATION\" at 0x7FF6A1B2C3D4 Fallout4.exe+2A1B2C3".to_string(),
        String::new(),
        "\t[Compatibility]".to_string(),
        "\t\tF4EE: true".to_string(),
        "\t\tMemoryManager: true".to_string(),
        "SYSTEM SPECS:".to_string(),
        "\tGPU #1: Nvidia GeForce RTX 3070".to_string(),
        "PROBABLE CALL STACK:".to_string(),
    ];
    for i in 0..stack_frames {
        lines.push(format!(
            "\t[{}] 0x7FF6A1B2{:04X} Mod{}.esp+0x{:X} BSResource::Archive TESForm",
            i,
            i,
            i % plugins.max(1),
            i * 16
        ));
    }
    lines.push("MODULES:".to_string());
    lines.push("\tFallout4.exe".to_string());
    lines.push("F4SE PLUGINS:".to_string());
    lines.push("\tbuffout4.dll v1.37.0".to_string());
    lines.push("PLUGINS:".to_string());
    for i in 0..plugins {
        lines.push(format!("\t[{:02X}]     Mod{}.esp", i + 1, i));
    }
    lines
}

fn bench_find_segments(c: &mut Criterion) {
    let rules = RuleDatabase::builtin().unwrap();
    let lines = synthetic_log(400, 200);
    c.bench_function("find_segments_400_frames", |b| {
        b.iter(|| {
            black_box(find_segments(black_box(lines.as_slice()), &rules.game));
        });
    });
}

fn bench_suspect_rules(c: &mut Criterion) {
    let rules = RuleDatabase::builtin().unwrap();
    let parsed = find_segments(synthetic_log(400, 200).as_slice(), &rules.game);
    let callstack = parsed.segments.callstack.join("\n");
    let scanner = SuspectScanner::new(&rules);
    c.bench_function("suspect_rules_400_frames", |b| {
        b.iter(|| {
            black_box(scanner.scan_stack(
                black_box(&parsed.header.main_error),
                black_box(&callstack),
                rules.warn_width,
            ));
        });
    });
}

fn bench_plugin_attribution(c: &mut Criterion) {
    let rules = RuleDatabase::builtin().unwrap();
    let parsed = find_segments(synthetic_log(400, 200).as_slice(), &rules.game);
    let analyzer = PluginAnalyzer::new(&rules);
    let version = Version::from_header(&parsed.header.game_version);
    let crashgen = Version::from_header(&parsed.header.crashgen_version);
    let plugins = analyzer
        .scan_log(&parsed.segments.plugins, &version, &crashgen)
        .plugins;
    c.bench_function("plugin_attribution_200_plugins", |b| {
        b.iter(|| {
            black_box(analyzer.count_matches(black_box(&parsed.segments.callstack), &plugins));
        });
    });
}

criterion_group!(
    scan_benches,
    bench_find_segments,
    bench_suspect_rules,
    bench_plugin_attribution
);
criterion_main!(scan_benches);
