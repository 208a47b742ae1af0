use std::path::{Path, PathBuf};
use std::sync::Arc;

use bucketform_provisioner::providers::{MemoryProvider, S3Provider};
use bucketform_provisioner::{
    BucketDeclaration, BucketProvider, CredentialSource, Operation, Plan, ProviderConfig,
    ReconcileError, Reconciler, ResourceSpec, StatePersistence,
};
use eyre::Result;

pub struct Options {
    pub spec: Option<PathBuf>,
    pub state: PathBuf,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
    pub memory: bool,
}

pub struct Context {
    spec_path: Option<PathBuf>,
    config: ProviderConfig,
    reconciler: Reconciler,
    persistence: StatePersistence,
    /// Holds the throwaway state directory of a `--memory` run.
    _scratch: Option<tempfile::TempDir>,
}

impl Context {
    pub async fn build(options: Options) -> Result<Self> {
        let mut config = ProviderConfig::from_env();
        if let Some(region) = options.region {
            config.region = region;
        }
        if let Some(profile_name) = options.profile {
            config.credentials = CredentialSource::Profile { profile_name };
        }
        if options.endpoint_url.is_some() {
            config.endpoint_url = options.endpoint_url;
        }

        // The in-memory provider forgets everything on exit, so its state
        // must not land in the file that tracks the real bucket.
        let scratch = if options.memory {
            Some(tempfile::tempdir()?)
        } else {
            None
        };

        let provider: Arc<dyn BucketProvider> = if scratch.is_some() {
            tracing::info!("using in-memory provider, nothing is sent to AWS");
            Arc::new(MemoryProvider::new())
        } else {
            Arc::new(S3Provider::connect(&config).await)
        };

        let state_path = match &scratch {
            Some(dir) => dir.path().join("state.json"),
            None => options.state,
        };

        Ok(Self {
            spec_path: options.spec,
            config,
            reconciler: Reconciler::new(provider),
            persistence: StatePersistence::new(state_path),
            _scratch: scratch,
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.persistence.local_path
    }

    fn load_spec(&self) -> Result<ResourceSpec> {
        let declaration = match &self.spec_path {
            Some(path) => BucketDeclaration::from_path(path)?,
            None => BucketDeclaration::from_env()?,
        };
        Ok(declaration.into_spec()?)
    }
}

pub async fn plan(ctx: &Context, json: bool) -> Result<()> {
    let spec = ctx.load_spec()?;
    let state = ctx.persistence.load().await?;
    let preview = bucketform_provisioner::preview(&ctx.reconciler, &state, &spec).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&preview.plan)?);
    } else {
        print_plan(&preview.plan);
    }
    Ok(())
}

pub async fn apply(ctx: &Context, confirm_replace: bool) -> Result<()> {
    let spec = ctx.load_spec()?;

    match bucketform_provisioner::provision(
        &ctx.reconciler,
        &ctx.persistence,
        &spec,
        confirm_replace,
    )
    .await
    {
        Ok(observed) => {
            println!("{} is up to date", observed.bucket);
            Ok(())
        }
        Err(ReconcileError::Apply(err)) => {
            for op in &err.completed {
                println!("  done     {op}");
            }
            println!("  FAILED   {}", err.failed);
            for op in &err.unattempted {
                println!("  skipped  {op}");
            }
            Err(eyre::eyre!(
                "apply stopped: {}; run apply again to resume",
                err.source
            ))
        }
        Err(ReconcileError::ReplaceRequired(replace)) => Err(eyre::eyre!(
            "{replace}; re-run with --confirm-replace to allow it"
        )),
        Err(ReconcileError::ObjectLock(mismatch)) => Err(eyre::eyre!(
            "{mismatch}; every other setting was applied, object lock has to be fixed by hand"
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn destroy(ctx: &Context) -> Result<()> {
    bucketform_provisioner::destroy(&ctx.reconciler, &ctx.persistence).await?;
    println!("managed bucket destroyed");
    Ok(())
}

pub fn render(ctx: &Context) -> Result<()> {
    let spec = ctx.load_spec()?;
    print!(
        "{}",
        bucketform_provisioner::render::terraform(&spec, &ctx.config.region)?
    );
    Ok(())
}

pub async fn show(ctx: &Context) -> Result<()> {
    let state = ctx.persistence.load().await?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn print_plan(plan: &Plan) {
    if let Some(mismatch) = &plan.object_lock {
        println!("! {mismatch}");
    }

    if !plan.has_changes() {
        println!("No changes. The bucket matches its declaration.");
        return;
    }

    if let Some(replace) = &plan.replace {
        println!("! {replace}");
    }
    for op in &plan.operations {
        let marker = match op {
            Operation::Create(_) => "+",
            Operation::Delete { .. } => "-",
            _ => "~",
        };
        println!("  {marker} {op}");
    }
    println!("{} operation(s) to apply.", plan.operations.len());
}
