use std::path::Path;

use console::style;
use miette::Result;
use terabridge::Bridge;

pub fn run(config: String) -> Result<()> {
    let bridge = Bridge::from_path(Path::new(&config))?;
    let renderer = bridge.renderer()?;

    println!(
        "{} Bridge config OK ({})",
        style("✓").green().bold(),
        style(bridge.config().root.display()).cyan()
    );

    println!("\n{}", style("Extensions:").bold());
    for name in renderer.extension_names() {
        println!("  {} {}", style("•").dim(), name);
    }

    let templates = renderer.template_names();
    println!(
        "\n{} ({} .{})",
        style("Templates:").bold(),
        templates.len(),
        bridge.template_extension()
    );
    for name in templates {
        println!("  {} {}", style("•").dim(), name);
    }

    if let Some(lexer) = renderer.lexer() {
        println!("\n{}", style("Delimiters:").bold());
        for (label, (start, end)) in [
            ("comment", lexer.comment()),
            ("block", lexer.block()),
            ("variable", lexer.variable()),
        ] {
            println!("  {:<9} {} {}", label, style(start).yellow(), style(end).yellow());
        }
        if lexer.is_native() {
            println!("  {}", style("(native Tera delimiters)").dim());
        }
    }

    Ok(())
}
