//! Infers primary language, framework, and package manager.

use std::path::Path;

use crate::analysis::dependencies::Manifest;
use crate::ports::fs::FileSystem;

/// Language reported when no known extension was seen.
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Maps a lower-cased file extension to a language name.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        "ts" | "tsx" | "mts" | "cts" => "TypeScript",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "py" | "pyi" => "Python",
        "rs" => "Rust",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "scala" => "Scala",
        "rb" => "Ruby",
        "php" => "PHP",
        "cs" => "C#",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "C++",
        "c" | "h" => "C",
        "swift" => "Swift",
        "dart" => "Dart",
        "lua" => "Lua",
        "ex" | "exs" => "Elixir",
        "vue" => "Vue",
        "svelte" => "Svelte",
        _ => return None,
    };
    Some(lang)
}

/// Picks the language with the most files.
///
/// Counts are tallied per language in the order extensions were first seen;
/// on a tie the language seen first wins.
pub fn detect_language(extension_counts: &[(String, usize)]) -> String {
    let mut tally: Vec<(&'static str, usize)> = Vec::new();
    for (ext, count) in extension_counts {
        if let Some(lang) = language_for_extension(ext) {
            match tally.iter_mut().find(|(l, _)| *l == lang) {
                Some((_, total)) => *total += count,
                None => tally.push((lang, *count)),
            }
        }
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (lang, count) in tally {
        if best.map_or(true, |(_, b)| count > b) {
            best = Some((lang, count));
        }
    }
    best.map(|(lang, _)| lang.to_string())
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
}

/// Marker packages in priority order. Meta-frameworks come before the
/// libraries they are built on.
const FRAMEWORK_MARKERS: &[(&str, &str)] = &[
    ("next", "Next.js"),
    ("nuxt", "Nuxt"),
    ("@angular/core", "Angular"),
    ("@sveltejs/kit", "SvelteKit"),
    ("@nestjs/core", "NestJS"),
    ("react", "React"),
    ("vue", "Vue"),
    ("svelte", "Svelte"),
    ("express", "Express"),
    ("fastify", "Fastify"),
    ("koa", "Koa"),
    ("tauri", "Tauri"),
    ("leptos", "Leptos"),
    ("axum", "Axum"),
    ("actix-web", "Actix Web"),
    ("rocket", "Rocket"),
];

/// Returns the first framework whose marker package is declared as a runtime
/// or development dependency.
pub fn detect_framework(manifest: &Manifest) -> Option<String> {
    FRAMEWORK_MARKERS
        .iter()
        .find(|(marker, _)| {
            manifest.dependencies.contains_key(*marker)
                || manifest.dev_dependencies.contains_key(*marker)
        })
        .map(|(_, name)| name.to_string())
}

/// Lock files checked first, then manifest conventions.
const LOCK_FILES: &[(&str, &str)] = &[
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("package-lock.json", "npm"),
    ("Cargo.lock", "cargo"),
];

const MANIFEST_CONVENTIONS: &[(&str, &str)] = &[
    ("package.json", "npm"),
    ("Cargo.toml", "cargo"),
    ("pyproject.toml", "pip"),
    ("requirements.txt", "pip"),
    ("go.mod", "go"),
    ("Gemfile", "bundler"),
    ("composer.json", "composer"),
    ("pom.xml", "maven"),
    ("build.gradle", "gradle"),
    ("build.gradle.kts", "gradle"),
];

/// Detects the package manager from files in the project root.
pub fn detect_package_manager(fs: &dyn FileSystem, root: &Path) -> Option<String> {
    LOCK_FILES
        .iter()
        .chain(MANIFEST_CONVENTIONS.iter())
        .find(|(file, _)| fs.exists(&root.join(file)))
        .map(|(_, manager)| manager.to_string())
}

/// The lock file a package manager writes, if it has one.
pub fn lock_file_for(package_manager: &str) -> Option<&'static str> {
    LOCK_FILES
        .iter()
        .find(|(_, manager)| *manager == package_manager)
        .map(|(file, _)| *file)
}
