//! `wrought check`: build every requested group and report failures.

use std::sync::Arc;

use anyhow::{Result, bail};

use crate::config::AppConfig;
use crate::locator::{FileLocatorFactory, UriLocatorFactory};
use crate::model::{FileModelSource, Group, ModelSource};
use crate::processor::{DefaultGroupProcessor, GroupProcessor};
use crate::{debug, log};

/// Outcome of checking one group.
#[derive(Debug, Default)]
pub struct GroupReport {
    pub group: String,
    /// `(uri, error)` for every resource that could not be read.
    pub failures: Vec<(String, String)>,
    /// Wildcard URIs that matched nothing.
    pub empty: Vec<String>,
}

impl GroupReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn check_model(config: &AppConfig, groups: &[String]) -> Result<()> {
    let source = FileModelSource::new(&config.model.path, config.model.format);
    let model = source.model()?;
    let locators: Arc<dyn UriLocatorFactory> =
        Arc::new(FileLocatorFactory::new(config.model.base_dir()));

    let selected: Vec<&Group> = if groups.is_empty() {
        model.groups().iter().collect()
    } else {
        let mut selected = Vec::with_capacity(groups.len());
        for name in groups {
            match model.group(name) {
                Some(group) => selected.push(group),
                None => bail!("group `{}` is not in {}", name, config.model.path.display()),
            }
        }
        selected
    };

    let processor = DefaultGroupProcessor::new(Arc::clone(&locators));
    let mut failed = 0;
    for group in selected {
        let report = check_group(group, locators.as_ref(), &processor);
        for uri in &report.empty {
            log!("warning"; "{}: `{}` matched no files", report.group, uri);
        }
        for (uri, err) in &report.failures {
            log!("error"; "{}: `{}`: {}", report.group, uri, err);
        }
        if report.is_ok() {
            log!("check"; "{} ok", report.group);
        } else {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} group(s) failed", failed);
    }
    Ok(())
}

/// Locate each resource, then run the full build for each type.
pub fn check_group(
    group: &Group,
    locators: &dyn UriLocatorFactory,
    processor: &dyn GroupProcessor,
) -> GroupReport {
    let mut report = GroupReport {
        group: group.name.clone(),
        ..GroupReport::default()
    };

    for resource in &group.resources {
        match locators.locate(&resource.uri) {
            Ok(bytes) if bytes.is_empty() && crate::locator::has_wildcard(&resource.uri) => {
                report.empty.push(resource.uri.clone());
            }
            Ok(_) => debug!("check"; "{}: {}", group.name, resource.uri),
            Err(err) => report.failures.push((resource.uri.clone(), err.to_string())),
        }
    }

    if report.is_ok() {
        for kind in group.kinds() {
            if let Err(err) = processor.process(group, kind, true) {
                report.failures.push((format!("{}.{}", group.name, kind), err.to_string()));
            }
        }
    }
    report
}
