//! Build and crossbuild orchestration.
//!
//! Both commands follow the same shape: everything that can fail fatally
//! (binary selection, flag rendering, image pulls) happens before the first
//! job is dispatched, then the scheduler fans the jobs out.

use std::collections::BTreeSet;
use std::sync::Arc;

use shipwright_core::naming::crossbuild_job_name;
use shipwright_core::{
    Classification, Config, FlagComposer, ImageResolver, PlatformClassifier, PlatformSpec,
    ToolchainImage,
};
use tracing::{debug, info, warn};

use crate::container::ContainerExecutor;
use crate::error::Result;
use crate::job::BuildJob;
use crate::native::{plan_jobs, NativeExecutor};
use crate::runner::ProcessRunner;
use crate::scheduler::{RunReport, Scheduler};

/// Inputs of a native build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// `all` or a comma-separated list of binary names.
    pub binaries: String,
    /// Explicit target; `None` builds for the host into the prefix itself.
    pub platform: Option<PlatformSpec>,
    pub concurrency: usize,
}

/// Build the selected binaries with the host toolchain, one job per binary.
///
/// Linker flags are composed once for the target OS and shared by every job.
pub async fn build(
    config: Arc<Config>,
    composer: &FlagComposer,
    runner: Arc<dyn ProcessRunner>,
    request: &BuildRequest,
) -> Result<RunReport> {
    let binaries = config.select_binaries(&request.binaries)?;
    let explicit = request.platform.is_some();
    let platform = request.platform.clone().unwrap_or_else(PlatformSpec::host);
    let ldflags = composer.compose(platform.os())?;

    let jobs = plan_jobs(&config.build.prefix, &binaries, &platform, explicit);
    info!(
        platform = %platform,
        binaries = jobs.len(),
        concurrency = request.concurrency,
        "building"
    );

    let executor = Arc::new(NativeExecutor::new(runner, Arc::clone(&config), ldflags));
    Ok(Scheduler::new(request.concurrency).run(executor, jobs).await)
}

/// Platforms, images and jobs of a crossbuild, computed without side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossbuildPlan {
    pub classification: Classification,
    /// Distinct images the jobs need, each listed once.
    pub images: Vec<ToolchainImage>,
    pub jobs: Vec<BuildJob>,
}

impl CrossbuildPlan {
    pub fn new(config: &Config, classifier: &PlatformClassifier) -> Self {
        let classification = classifier.classify(&config.crossbuild.platforms);
        let resolver = ImageResolver::new(
            config.crossbuild.builder_image.as_str(),
            config.go.version.as_str(),
            config.go.cgo,
        )
        .with_per_family_images(config.crossbuild.per_family_images);

        let groups = resolver.group(&classification.platforms);
        let images: BTreeSet<ToolchainImage> = groups.iter().map(|(image, _)| image.clone()).collect();
        let jobs = groups
            .into_iter()
            .flat_map(|(image, platforms)| {
                platforms.into_iter().map(move |platform| {
                    BuildJob::container(
                        crossbuild_job_name(&image.family, &platform),
                        image.clone(),
                        platform,
                    )
                })
            })
            .collect();

        Self {
            classification,
            images: images.into_iter().collect(),
            jobs,
        }
    }

    pub fn platforms(&self) -> &[PlatformSpec] {
        &self.classification.platforms
    }

    pub fn warning(&self) -> Option<String> {
        self.classification.warning()
    }

    /// Distinct target operating systems, sorted.
    pub fn target_oses(&self) -> Vec<&str> {
        let oses: BTreeSet<&str> = self.jobs.iter().map(|j| j.platform.os()).collect();
        oses.into_iter().collect()
    }
}

/// Build every configured platform in builder containers, one job per platform.
///
/// The builder entrypoint renders linker flags from the mounted configuration
/// itself, so the composed flags are not forwarded. They are still rendered
/// here for every target OS so a broken template ends the run before any
/// image is pulled.
pub async fn crossbuild(
    config: &Config,
    composer: &FlagComposer,
    executor: Arc<ContainerExecutor>,
    concurrency: usize,
) -> Result<RunReport> {
    let plan = CrossbuildPlan::new(config, &PlatformClassifier::default());
    if let Some(warning) = plan.warning() {
        warn!("{warning}");
    }
    if plan.jobs.is_empty() {
        warn!("no platforms selected for crossbuild");
        return Ok(RunReport::default());
    }

    for os in plan.target_oses() {
        let ldflags = composer.compose(os)?;
        debug!(os, ldflags = %ldflags, "linker flags");
    }

    for image in &plan.images {
        executor.pull(image).await?;
    }

    info!(
        platforms = plan.platforms().len(),
        images = plan.images.len(),
        concurrency,
        "crossbuilding"
    );
    Ok(Scheduler::new(concurrency).run(executor, plan.jobs).await)
}
