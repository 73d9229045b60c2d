//! Build the site, optionally rebuilding on change

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::generator::BuildReport;
use crate::Site;

/// Generate the static site once
pub fn run(site: &Site) -> Result<BuildReport> {
    tracing::info!("Building {:?} into {:?}", site.content_dir, site.output_dir);
    let report = site.generate()?;
    Ok(report)
}

/// Paths a rebuild should ignore
pub fn is_ignored(path: &Path, site: &Site) -> bool {
    if path.starts_with(&site.output_dir) {
        return true;
    }
    let path_str = path.to_string_lossy();
    path_str.contains(".git")
        || path_str.contains(".DS_Store")
        || path_str.contains("node_modules")
        || path_str.ends_with('~')
}

/// Quiet period before a burst of file events triggers one rebuild
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Paths to watch for a site: content recursively, config and template alone
pub fn watch_targets(site: &Site) -> Vec<(PathBuf, RecursiveMode)> {
    let mut targets = vec![
        (site.content_dir.clone(), RecursiveMode::Recursive),
        (site.config_path(), RecursiveMode::NonRecursive),
    ];
    if let Some(template) = &site.template_path {
        targets.push((template.clone(), RecursiveMode::NonRecursive));
    }
    targets
}

/// Block on a debounced watcher, calling `on_change` once per burst
///
/// Every event of a burst is delivered once the burst has been quiet for
/// [`DEBOUNCE`], so the last save is never lost. Returning
/// `ControlFlow::Break` stops watching.
pub fn watch_changes<F>(site: &Site, mut on_change: F) -> Result<()>
where
    F: FnMut(&[PathBuf]) -> ControlFlow<()>,
{
    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx)?;

    for (path, mode) in watch_targets(site) {
        if path.exists() {
            debouncer.watcher().watch(&path, mode)?;
            tracing::debug!("Watching: {:?}", path);
        }
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .into_iter()
                    .map(|e| e.path)
                    .filter(|p| !is_ignored(p, site))
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                if on_change(&changed).is_break() {
                    break;
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Re-read the config and regenerate, keeping the prerender setting
pub fn rebuild(site: &Site) -> crate::Result<Site> {
    let mut fresh = Site::new(&site.base_dir)?;
    if site.config.prerender {
        fresh = fresh.prerender(true);
    }
    fresh.generate()?;
    Ok(fresh)
}

/// Watch content, config and template, regenerating on change
pub async fn watch(site: &Site) -> Result<()> {
    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let site = site.clone();
    tokio::task::spawn_blocking(move || {
        watch_changes(&site, |changed| {
            for path in changed {
                tracing::info!("File changed: {}", path.display());
            }
            if let Err(e) = rebuild(&site) {
                tracing::error!("Build failed: {}", e);
            }
            ControlFlow::Continue(())
        })
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_run_reports_counts() {
        let tmp = TempDir::new().unwrap();
        let blog = tmp.path().join("public/blog");
        fs::create_dir_all(&blog).unwrap();
        fs::write(blog.join("hello.md"), "---\ntitle: Hello\n---\nHi").unwrap();

        let site = Site::new(tmp.path()).unwrap();
        let report = run(&site).unwrap();
        // index, blog x2, blog/hello x2, portfolio x2, about x2, 404
        assert_eq!(report.pages, 10);
        assert_eq!(report.modules, 4);
        assert_eq!(report.assets, 1);
        assert!(tmp.path().join("dist/blog/hello/index.html").exists());
    }

    #[test]
    fn test_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let site = Site::new(tmp.path()).unwrap();
        assert!(is_ignored(&site.output_dir.join("index.html"), &site));
        assert!(is_ignored(&site.content_dir.join(".git/HEAD"), &site));
        assert!(is_ignored(&site.content_dir.join("blog/a.md~"), &site));
        assert!(!is_ignored(&site.content_dir.join("blog/a.md"), &site));
    }

    #[test]
    fn test_watch_targets() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("_config.yml"), "template: shell.html\n").unwrap();
        let site = Site::new(tmp.path()).unwrap();

        let targets = watch_targets(&site);
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0], (site.content_dir.clone(), RecursiveMode::Recursive));
        assert_eq!(targets[2].0, tmp.path().join("shell.html"));
    }

    #[test]
    fn test_rebuild_rereads_config() {
        let tmp = TempDir::new().unwrap();
        let site = Site::new(tmp.path()).unwrap().prerender(true);
        fs::write(tmp.path().join("_config.yml"), "output_dir: out\n").unwrap();

        let fresh = rebuild(&site).unwrap();
        assert!(fresh.config.prerender);
        assert!(tmp.path().join("out/index.html").exists());
    }

    #[test]
    fn test_late_change_in_burst_is_delivered() {
        let tmp = TempDir::new().unwrap();
        let blog = tmp.path().join("public/blog");
        fs::create_dir_all(&blog).unwrap();
        let site = Site::new(tmp.path()).unwrap();

        let (tx, rx) = channel();
        std::thread::spawn(move || {
            let mut seen = Vec::new();
            let _ = watch_changes(&site, |changed| {
                seen.extend(changed.iter().filter_map(|p| p.file_name()).map(|n| n.to_owned()));
                let done = ["first.md", "second.md"]
                    .iter()
                    .all(|name| seen.iter().any(|s| s == *name));
                if done {
                    let _ = tx.send(());
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
        });

        // Give the watcher time to register, then save twice inside one window
        std::thread::sleep(Duration::from_millis(300));
        fs::write(blog.join("first.md"), "one").unwrap();
        std::thread::sleep(Duration::from_millis(100));
        fs::write(blog.join("second.md"), "two").unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(10)).is_ok());
    }
}
