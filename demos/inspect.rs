/// Walkthrough of the inspection flow against a small generated project:
/// builds a PHP fixture on disk, wires up both container backends, lists
/// the registered services and prints the hidden lookups it finds.
use std::fs;
use std::path::Path;
use std::sync::Arc;

use laminas_inspect::{
    ClassMap, DiRegistryContainer, ServiceInspector, ServiceManagerContainer, ServiceValue,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write_demo_project(dir.path())?;

    let classes = Arc::new(ClassMap::from_php_sources(dir.path())?);
    println!("Class map: {} classes from {:?}\n", classes.len(), dir.path());

    // Service-manager shaped container
    let mut manager = ServiceManagerContainer::new();
    manager.set_factory("reports", "App\\Factory\\ReportFactory", || {
        Ok(ServiceValue::object("App\\Service\\ReportGenerator"))
    });
    manager.set_invokable_class("mailer", "App\\Service\\Mailer");
    manager.set_alias("report.generator", "reports");
    manager.set_service("config", ServiceValue::Array(vec![]));

    let inspector = ServiceInspector::new(manager, classes.clone());

    println!("=== Registered services (service manager) ===");
    for info in inspector.all_services() {
        println!(
            "  {:<20} {:<10} {}{}",
            info.name,
            info.kind.to_string(),
            info.class,
            if info.aliases.is_empty() {
                String::new()
            } else {
                format!("  (aliases: {})", info.aliases.join(", "))
            }
        );
    }

    println!("\n=== Hidden dependencies of \"reports\" ===");
    for finding in inspector.hidden_dependencies("reports")? {
        println!(
            "  {} @ {}:{}\n    {}",
            finding.service,
            finding.file.display(),
            finding.line,
            finding.context
        );
    }

    // Registry shaped container over the same classes
    let mut registry = DiRegistryContainer::new();
    registry.register("App\\Service\\ReportGenerator", true, || {
        Ok(ServiceValue::object("App\\Service\\ReportGenerator"))
    });
    registry.register_alias("reports", "App\\Service\\ReportGenerator");

    let inspector = ServiceInspector::new(registry, classes);

    println!("\n=== Registered services (registry) ===");
    for info in inspector.all_services() {
        println!("  {:<30} {:<10} {}", info.name, info.kind.to_string(), info.class);
    }

    Ok(())
}

fn write_demo_project(root: &Path) -> std::io::Result<()> {
    let vendor = root.join("vendor/sr/di/src");
    let app = root.join("app/src/Service");
    fs::create_dir_all(&vendor)?;
    fs::create_dir_all(&app)?;

    fs::write(
        vendor.join("AbstractDi.php"),
        r#"<?php

namespace SR\Di;

abstract class AbstractDi
{
    public function getDi($name)
    {
        return Di::instance()->get($name);
    }
}
"#,
    )?;

    fs::write(
        app.join("ReportGenerator.php"),
        r#"<?php

namespace App\Service;

use SR\Di\AbstractDi;

class ReportGenerator extends AbstractDi
{
    public function generate(): array
    {
        $logger = $this->getDi('Logger');
        $config = Registry::get('config');

        return [$logger, $config];
    }
}
"#,
    )?;

    fs::write(
        app.join("Mailer.php"),
        r#"<?php

namespace App\Service;

class Mailer
{
    public function send(): void
    {
    }
}
"#,
    )?;

    Ok(())
}
