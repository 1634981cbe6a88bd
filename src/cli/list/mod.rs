//! List registry components or what is installed.
//!
//! ```bash
//! greater list                      # everything in the registry at the effective ref
//! greater list --tree               # with dependency trees
//! greater list --installed          # from .greater/installed.json, no network
//! greater list --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

use super::common::{CommandContext, OutputFormat};
use crate::config::ComponentConfig;
use crate::installed::InstalledState;
use crate::registry::{FetchIndexOptions, RegistryClient, RegistryIndex};
use crate::resolver::DependencyResolver;

#[derive(Args)]
pub struct ListCommand {
    /// Only installed components
    #[arg(long)]
    installed: bool,

    /// Show dependency trees
    #[arg(long)]
    tree: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Registry ref (branch, tag, or commit)
    #[arg(long = "ref", value_name = "REF")]
    git_ref: Option<String>,

    /// Use the cached index only
    #[arg(long)]
    offline: bool,

    /// Fetch the index again even when cached
    #[arg(long)]
    refresh: bool,
}

/// One row of output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListItem {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    dependencies: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    packages: BTreeMap<String, String>,
    /// Ref the component was installed from
    #[serde(skip_serializing_if = "Option::is_none")]
    installed: Option<String>,
    files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<String>,
}

impl ListCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let installed = InstalledState::load(&ctx.project_dir)?;

        if self.installed && !self.tree {
            let items = installed_items(&installed);
            return self.output(&items, "No components installed");
        }

        // components.json is optional here; it only contributes a pinned ref
        let config = ComponentConfig::load(&ctx.project_dir).ok();
        let git_ref = ctx.effective_ref(self.git_ref.as_deref(), config.as_ref());
        let fetcher = ctx.fetcher(self.offline)?;
        let options = FetchIndexOptions {
            refresh: self.refresh,
        };
        let index = RegistryClient::new(&fetcher).fetch_registry_index(&git_ref, options).await?;

        let mut items = registry_items(&index, &installed, self.tree)?;
        if self.installed {
            items.retain(|item| item.installed.is_some());
        }
        if self.format == OutputFormat::Text && !self.installed {
            println!("{} {}\n", "Registry at".dimmed(), git_ref.bold());
        }
        self.output(&items, "The registry has no components")
    }

    fn output(&self, items: &[ListItem], empty: &str) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
            OutputFormat::Text if items.is_empty() => println!("{empty}"),
            OutputFormat::Text => {
                for item in items {
                    print_item(item);
                }
            }
        }
        Ok(())
    }
}

fn installed_items(installed: &InstalledState) -> Vec<ListItem> {
    let mut items: Vec<ListItem> = installed
        .components
        .iter()
        .map(|c| ListItem {
            name: c.name.clone(),
            description: None,
            dependencies: Vec::new(),
            packages: BTreeMap::new(),
            installed: Some(c.git_ref.clone()),
            files: c.files.len(),
            tree: None,
        })
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    items
}

fn registry_items(
    index: &RegistryIndex,
    installed: &InstalledState,
    tree: bool,
) -> Result<Vec<ListItem>> {
    let graph = if tree {
        let all: Vec<String> = index.components.iter().map(|c| c.name.clone()).collect();
        Some(DependencyResolver::new(index).resolve(&all)?.graph)
    } else {
        None
    };

    let mut items: Vec<ListItem> = index
        .components
        .iter()
        .map(|c| ListItem {
            name: c.name.clone(),
            description: c.description.clone(),
            dependencies: c.component_dependencies().map(str::to_string).collect(),
            packages: c
                .package_dependencies()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            installed: installed.get(&c.name).map(|i| i.git_ref.clone()),
            files: c.files.len(),
            tree: graph.as_ref().map(|g| g.to_tree_string(&c.name)),
        })
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

fn print_item(item: &ListItem) {
    if let Some(tree) = &item.tree {
        let mut lines = tree.lines();
        if let Some(root) = lines.next() {
            println!("{}{}", root.bold(), installed_marker(item));
        }
        for line in lines {
            println!("{line}");
        }
        return;
    }

    let description = item.description.as_deref().map(|d| format!(" - {d}")).unwrap_or_default();
    println!("{}{}{}", item.name.bold(), installed_marker(item), description.dimmed());
    if !item.dependencies.is_empty() {
        println!("    {} {}", "depends on".dimmed(), item.dependencies.join(", "));
    }
    if !item.packages.is_empty() {
        let specs: Vec<String> = item.packages.iter().map(|(n, v)| format!("{n}@{v}")).collect();
        println!("    {} {}", "packages".dimmed(), specs.join(", "));
    }
}

fn installed_marker(item: &ListItem) -> String {
    match &item.installed {
        Some(git_ref) => format!(" {}", format!("[installed @ {git_ref}]").green()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installed::InstalledComponent;
    use crate::test_utils::sample_registry;

    #[test]
    fn test_registry_items_mark_installed_and_build_trees() {
        let index = sample_registry("v1.0.0").index();
        let mut installed = InstalledState::default();
        installed.upsert(InstalledComponent {
            name: "Icon".to_string(),
            git_ref: "v1.0.0".to_string(),
            files: Vec::new(),
            installed_at: chrono::Utc::now(),
        });

        let items = registry_items(&index, &installed, true).unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Button", "Icon", "theme", "utils"]);

        let button = &items[0];
        assert_eq!(button.dependencies, vec!["Icon", "utils"]);
        assert_eq!(button.packages["clsx"], "^2.1.0");
        assert!(button.installed.is_none());
        assert_eq!(button.tree.as_deref(), Some("Button\n├── Icon\n└── utils\n"));
        assert_eq!(items[1].installed.as_deref(), Some("v1.0.0"));

        let json = serde_json::to_value(&items[1]).unwrap();
        assert_eq!(json["installed"], "v1.0.0");
        assert!(json.get("packages").is_none());
    }

    #[test]
    fn test_installed_items_sorted() {
        let mut installed = InstalledState::default();
        for name in ["theme", "Button"] {
            installed.upsert(InstalledComponent {
                name: name.to_string(),
                git_ref: "main".to_string(),
                files: Vec::new(),
                installed_at: chrono::Utc::now(),
            });
        }
        let items = installed_items(&installed);
        assert_eq!(items[0].name, "Button");
        assert_eq!(items[1].installed.as_deref(), Some("main"));
    }
}
