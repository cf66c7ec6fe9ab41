use std::process::Command;

const INPUT_CSS: &str = "assets/css/input.css";
const OUTPUT_CSS: &str = "assets/css/output.css";

fn main() {
    println!("cargo:rerun-if-changed={INPUT_CSS}");
    println!("cargo:rerun-if-changed=templates/");

    let status = Command::new("tailwindcss")
        .args(["-i", INPUT_CSS, "-o", OUTPUT_CSS, "--minify"])
        .status();

    match status {
        Ok(s) if s.success() => {
            println!("cargo:warning=Tailwind CSS compiled successfully");
        }
        _ => {
            println!("cargo:warning=Tailwind CLI not found, using fallback CSS");
            std::fs::create_dir_all("assets/css").ok();
            std::fs::write(OUTPUT_CSS, FALLBACK_CSS).ok();
        }
    }
}

// Hand-written subset of the utility classes the templates use.
const FALLBACK_CSS: &str = r#"*, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: system-ui, -apple-system, sans-serif; line-height: 1.6; color: #1c1917; background: #fafaf9; }
a { color: inherit; text-decoration: none; }
a:hover { opacity: 0.8; }
label { display: block; margin-top: 0.75rem; }
input, select, textarea { width: 100%; padding: 0.5rem; border: 1px solid #d6d3d1; border-radius: 0.5rem; font: inherit; }
ul { padding-left: 1.25rem; }
.min-h-screen { min-height: 100vh; }
.mx-auto { margin-left: auto; margin-right: auto; }
.max-w-4xl { max-width: 56rem; }
.max-w-xl { max-width: 36rem; }
.max-w-md { max-width: 28rem; }
.px-4 { padding-left: 1rem; padding-right: 1rem; }
.py-3 { padding-top: 0.75rem; padding-bottom: 0.75rem; }
.py-8 { padding-top: 2rem; padding-bottom: 2rem; }
.py-16 { padding-top: 4rem; padding-bottom: 4rem; }
.mb-2 { margin-bottom: 0.5rem; }
.mb-4 { margin-bottom: 1rem; }
.mb-8 { margin-bottom: 2rem; }
.mt-1 { margin-top: 0.25rem; }
.mt-4 { margin-top: 1rem; }
.flex { display: flex; }
.items-center { align-items: center; }
.justify-center { justify-content: center; }
.justify-between { justify-content: space-between; }
.gap-3 { gap: 0.75rem; }
.text-center { text-align: center; }
.text-xs { font-size: 0.75rem; }
.text-sm { font-size: 0.875rem; }
.text-lg { font-size: 1.125rem; }
.text-xl { font-size: 1.25rem; }
.text-4xl { font-size: 2.25rem; }
.font-medium { font-weight: 500; }
.font-semibold { font-weight: 600; }
.font-bold { font-weight: 700; }
.text-stone-500 { color: #78716c; }
.text-stone-700 { color: #44403c; }
.text-stone-900 { color: #1c1917; }
.bg-white { background-color: #fff; }
.bg-stone-50 { background-color: #fafaf9; }
.border-b { border-bottom: 1px solid; }
.border-stone-200 { border-color: #e7e5e4; }
.whitespace-pre-wrap { white-space: pre-wrap; }
.btn { display: inline-flex; align-items: center; justify-content: center; padding: 0.5rem 1rem; border-radius: 0.5rem; font-size: 0.875rem; font-weight: 500; cursor: pointer; }
.btn-primary { background: #1c1917; color: #fff; border: none; }
.btn-secondary { background: #fff; color: #1c1917; border: 1px solid #d6d3d1; }
.btn-danger { background: #b91c1c; color: #fff; border: none; }
.card { background: #fff; border-radius: 0.75rem; border: 1px solid #e7e5e4; padding: 1.5rem; box-shadow: 0 1px 2px 0 rgb(0 0 0 / 0.05); }
.flash { padding: 0.75rem 1rem; border-radius: 0.5rem; border: 1px solid; }
.flash-notice { background: #f0fdf4; color: #166534; border-color: #bbf7d0; }
.flash-alert { background: #fef2f2; color: #991b1b; border-color: #fecaca; }
.page-link { padding: 0.5rem 0.75rem; border: 1px solid #d6d3d1; border-radius: 0.5rem; font-size: 0.875rem; }
.page-link.current { background: #1c1917; color: #fff; }
.page-link.disabled { opacity: 0.5; }
"#;
