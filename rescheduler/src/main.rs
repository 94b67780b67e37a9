use clap::Parser;
use tokio::sync::mpsc;

use smokemini_rescheduler::args::Args;
use smokemini_rescheduler::libs::k8s::watch;
use smokemini_rescheduler::{K8s, Rescheduler};

/// The smoke-mini rescheduler
#[tokio::main]
async fn main() {
    // install a crypto provider for rustls
    // Rustls will complain if this is not run but we can ignore any errors
    // https://github.com/rustls/rustls/issues/1938
    let _ = rustls::crypto::ring::default_provider().install_default();
    // get command line args
    let args = Args::parse();
    // try to load a config file
    let conf = smokemini::Conf::new(&args.config).expect("Failed to load config");
    // setup our tracer
    smokemini::utils::trace::setup("SmokeMiniRescheduler", &conf.tracing);
    // connect to the cluster our probes run in
    let k8s = K8s::new(&conf, args.context_name.as_deref())
        .await
        .expect("Failed to connect to k8s");
    if args.once {
        let mut rescheduler = Rescheduler::new(conf, k8s, args.dry_run);
        rescheduler.init().await.expect("Rescheduler failed to initialize");
        rescheduler.reschedule().await.expect("Reschedule failed");
        return;
    }
    // forward cluster events to our task loop
    let (tx, rx) = mpsc::unbounded_channel();
    watch::spawn(k8s.client(), &conf, &tx);
    let mut rescheduler = Rescheduler::new(conf, k8s, args.dry_run).with_events(rx);
    rescheduler.start().await.expect("Rescheduler crashed");
}
