use kure_gvk::TypeTag;
use kure_stack::{
    ConverterOptions, FlatStack, ReferenceMode, TreeConverter, scheme,
    tree::{Application, BootstrapConfig, Bundle, Cluster, GitOpsConfig, Node, SourceRef},
};
use rstest::{fixture, rstest};

fn application(name: &str) -> Application {
    let mut application = Application::new(name);
    application.namespace = "default".to_owned();
    application.config = serde_yaml::from_str("image: nginx:1.27\nreplicas: 2\n")
        .expect("config is valid YAML");
    application
}

#[fixture]
fn applications() -> Vec<Application> {
    vec![
        application("app1"),
        application("app2").with_generator(TypeTag::new("generators.kure.dev", "v1alpha1", "HelmChart")),
        application("app3"),
    ]
}

#[fixture]
fn cluster(applications: Vec<Application>) -> Cluster {
    let [app1, app2, app3] = <[Application; 3]>::try_from(applications).expect("three applications");
    let source = SourceRef {
        kind: "GitRepository".to_owned(),
        name: "flux-system".to_owned(),
        namespace: "flux-system".to_owned(),
        ..SourceRef::default()
    };

    let mut cluster = Cluster::new("prod").with_gitops(GitOpsConfig {
        tool: "flux".to_owned(),
        bootstrap: Some(BootstrapConfig {
            enabled: true,
            flux_mode: "flux-operator".to_owned(),
            components: vec!["source-controller".to_owned()],
            ..BootstrapConfig::default()
        }),
    });

    let root = cluster.add_root(Node::new("root"));
    let infra = cluster.add_child(
        root,
        Node::new("infra").with_package_ref(TypeTag::new("source.toolkit.fluxcd.io", "v1", "OCIRepository")),
    );
    let infra_bundle = cluster.set_bundle(
        infra,
        Bundle::new("infra-bundle")
            .with_application(app1)
            .with_application(app2)
            .with_source_ref(source.clone())
            .with_interval("10m"),
    );

    let apps = cluster.add_child(root, Node::new("apps").with_label("tier", "apps"));
    let frontend = cluster.add_child(apps, Node::new("frontend"));
    let fe_bundle = cluster.set_bundle(
        frontend,
        Bundle::new("fe-bundle")
            .with_application(app3)
            .with_source_ref(source)
            .with_interval("5m"),
    );
    cluster.bundle_mut(fe_bundle).prune = true;
    cluster.add_dependency(fe_bundle, infra_bundle);

    cluster
}

fn paths(cluster: &Cluster) -> Vec<String> {
    cluster
        .walk()
        .into_iter()
        .map(|id| cluster.node_path(id))
        .collect()
}

#[rstest]
fn tree_survives_records(cluster: Cluster, applications: Vec<Application>) {
    let converter = TreeConverter::default();
    let stack = converter.tree_to_records(&cluster);

    assert_eq!(stack.nodes.len(), 4);
    assert_eq!(stack.bundles.len(), 2);
    stack.validate().expect("records are valid");

    let rebuilt = converter
        .stack_to_tree(&stack, &applications)
        .expect("records are complete");

    assert_eq!(paths(&rebuilt), ["root", "root/infra", "root/apps", "root/apps/frontend"]);

    let frontend = rebuilt.find_node("root/apps/frontend").expect("frontend exists");
    let fe_bundle = rebuilt.node_bundle(frontend).expect("frontend has a bundle");
    let app_names: Vec<_> = fe_bundle.applications.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(app_names, ["app3"]);

    let dependency = rebuilt.bundle(fe_bundle.depends_on()[0]);
    assert_eq!(dependency.name, "infra-bundle");
    assert_eq!(dependency.applications.len(), 2);

    assert_eq!(rebuilt, cluster);
}

#[rstest]
fn tree_survives_yaml(cluster: Cluster, applications: Vec<Application>) {
    let converter = TreeConverter::default();
    let yaml = converter
        .tree_to_records(&cluster)
        .to_yaml()
        .expect("stack encodes");

    let stack = FlatStack::decode(&scheme(), yaml.as_bytes()).expect("output decodes");
    let rebuilt = converter
        .stack_to_tree(&stack, &applications)
        .expect("records are complete");

    assert_eq!(rebuilt, cluster);
}

#[rstest]
fn records_are_independent_of_the_tree(cluster: Cluster) {
    let stack = TreeConverter::default().tree_to_records(&cluster);
    let mut changed = cluster.clone();

    if let Some(bootstrap) = changed.gitops.as_mut().and_then(|g| g.bootstrap.as_mut()) {
        bootstrap.components.push("helm-controller".to_owned());
    }

    let components = &stack
        .cluster
        .spec
        .gitops
        .as_ref()
        .and_then(|gitops| gitops.bootstrap.as_ref())
        .expect("bootstrap is set")
        .components;
    assert_eq!(components, &["source-controller"]);
}

#[rstest]
fn missing_application_is_dropped_leniently(cluster: Cluster, applications: Vec<Application>) {
    let stack = TreeConverter::default().tree_to_records(&cluster);
    let known: Vec<_> = applications
        .into_iter()
        .filter(|application| application.name != "app2")
        .collect();

    TreeConverter::default()
        .stack_to_tree(&stack, &known)
        .expect_err("app2 is missing");

    let lenient = TreeConverter::new(ConverterOptions {
        reference_mode: ReferenceMode::Lenient,
        ..ConverterOptions::default()
    });
    let rebuilt = lenient
        .stack_to_tree(&stack, &known)
        .expect("missing applications are dropped");

    let infra_bundle = rebuilt.find_bundle("infra-bundle").expect("bundle exists");
    assert_eq!(rebuilt.bundle(infra_bundle).applications.len(), 1);
}
