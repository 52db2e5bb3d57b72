//! Kubernetes objects for work units and the image pre-pull

use std::collections::BTreeMap;

use batchfleet_api::{
    Container, DaemonSet, DaemonSetSpec, EnvVar, Job, JobSpec, LabelSelector, ObjectMeta, PodSpec,
    PodTemplateSpec, ResourceRequirements,
};
use batchfleet_manifest::DatasetSource;

use crate::partition::WorkUnit;

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGER: &str = "batchfleet";
pub const RUN_LABEL: &str = "batchfleet/run";
pub const DATASET_INDEX_LABEL: &str = "batchfleet/dataset-index";

/// Name of the DaemonSet `prepare` uses to pull the worker image onto every node.
pub const PREPULL_NAME: &str = "batchfleet-prepull";

const PAUSE_IMAGE: &str = "registry.k8s.io/pause:3.9";

/// Directory inside the job container that downloads land in.
const INPUT_DIR: &str = "/tmp/inputs";

/// Label selector matching every object this tool manages.
pub fn managed_selector() -> String {
    format!("{}={}", MANAGED_BY_LABEL, MANAGER)
}

fn managed_labels() -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGER.to_string());
    labels
}

/// The Job that processes one work unit.
pub fn build_job(unit: &WorkUnit, namespace: &str) -> Job {
    let mut labels = managed_labels();
    labels.insert(RUN_LABEL.to_string(), unit.run().to_string());
    labels.insert(DATASET_INDEX_LABEL.to_string(), unit.index.to_string());

    let container = Container {
        name: "worker".to_string(),
        image: unit.template.image.clone(),
        command: Vec::new(),
        env: job_env(unit),
        resources: Some(ResourceRequirements::guaranteed(
            "cpu",
            &unit.template.resources.cpu,
        )),
    };

    let spec = JobSpec {
        backoff_limit: Some(unit.template.backoff_limit),
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta::default().with_labels(labels.clone())),
            spec: PodSpec {
                init_containers: Vec::new(),
                containers: vec![container],
                restart_policy: Some("Never".to_string()),
            },
        },
    };

    Job::new(
        ObjectMeta::named(&unit.job_name, namespace).with_labels(labels),
        spec,
    )
}

fn object_key(unit: &WorkUnit, path: &str) -> String {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("out");
    format!("{}/{}.{}", unit.run(), unit.job_name, extension)
}

/// Environment handed to the worker container.
pub fn job_env(unit: &WorkUnit) -> Vec<EnvVar> {
    let t = &unit.template;
    let storage = &t.storage;

    let mut env = vec![
        EnvVar::new("DATASET", &unit.dataset.name),
        EnvVar::new("DATASET_INDEX", unit.index.to_string()),
        EnvVar::new("RUN", t.run.as_str()),
        EnvVar::new("STORAGE_TYPE", storage.kind().to_string()),
        EnvVar::new("STORAGE_HOST", storage.endpoint()),
        EnvVar::new("BUCKET", t.input_bucket.as_str()),
        EnvVar::new("OUTPUT_BUCKET", t.outputs.bucket.as_str()),
        EnvVar::new("OUTPUT_FILE", t.outputs.file.as_str()),
        EnvVar::new("OUTPUT_JSON_FILE", t.outputs.json_file.as_str()),
        EnvVar::new("MULTIPART_THREADS", t.throughput.multipart_threads.to_string()),
        EnvVar::new("DOWNLOAD_MAX_KB", t.throughput.download_max_kb.to_string()),
        EnvVar::new("UPLOAD_MAX_KB", t.throughput.upload_max_kb.to_string()),
        EnvVar::new("REDIS_HOST", t.redis_host.as_str()),
        EnvVar::new("GCS_PROJECT_ID", t.gcs_project_id.as_str()),
    ];

    match unit.dataset.source {
        DatasetSource::Files(ref files) => {
            env.push(EnvVar::new("DATASET_FILES", files.join(" ")));
            let downloads: Vec<String> = files
                .iter()
                .map(|file| {
                    let name = file.rsplit('/').next().unwrap_or(file);
                    storage
                        .download(&t.input_bucket, file, &format!("{}/{}", INPUT_DIR, name))
                        .to_string()
                })
                .collect();
            env.push(EnvVar::new("DOWNLOAD_COMMANDS", downloads.join("\n")));
        }
        DatasetSource::Pattern(ref pattern) => {
            env.push(EnvVar::new("DATASET_PATTERN", pattern.as_str()));
        }
    }

    env.push(EnvVar::new(
        "UPLOAD_COMMAND",
        storage
            .upload(&t.outputs.file, &t.outputs.bucket, &object_key(unit, &t.outputs.file))
            .to_string(),
    ));
    env.push(EnvVar::new(
        "UPLOAD_JSON_COMMAND",
        storage
            .upload(
                &t.outputs.json_file,
                &t.outputs.bucket,
                &object_key(unit, &t.outputs.json_file),
            )
            .to_string(),
    ));

    env.extend(
        storage
            .env()
            .into_iter()
            .map(|(name, value)| EnvVar::new(name, value)),
    );
    env
}

/// DaemonSet whose init container pulls `image` onto every node.
pub fn build_prepull(image: &str, namespace: &str) -> DaemonSet {
    let mut labels = managed_labels();
    labels.insert("app".to_string(), PREPULL_NAME.to_string());

    let mut selector = BTreeMap::new();
    selector.insert("app".to_string(), PREPULL_NAME.to_string());

    DaemonSet::new(
        ObjectMeta::named(PREPULL_NAME, namespace).with_labels(labels.clone()),
        DaemonSetSpec {
            selector: LabelSelector {
                match_labels: selector,
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta::default().with_labels(labels)),
                spec: PodSpec {
                    init_containers: vec![Container {
                        name: "prepull".to_string(),
                        image: image.to_string(),
                        command: vec!["sh".to_string(), "-c".to_string(), "true".to_string()],
                        ..Container::default()
                    }],
                    containers: vec![Container {
                        name: "pause".to_string(),
                        image: PAUSE_IMAGE.to_string(),
                        ..Container::default()
                    }],
                    restart_policy: None,
                },
            },
        },
    )
}
