//! Minimal end-to-end run: spawn one actor, send it a message, drain.

use actor_runtime::{Actor, ActorSystem, Context, HandlerTable};

struct Greeter;

impl Actor for Greeter {
    fn register(&mut self, handlers: &mut HandlerTable<Self>) {
        handlers.handle(Self::on_message);
    }
}

impl Greeter {
    fn on_message(&mut self, _ctx: &mut Context, msg: String) {
        println!("{msg}");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let system = ActorSystem::new();
    let greeter = system.spawn(Greeter);
    system.send(&greeter, "hello from the mailbox".to_string());
    system.wait_idle();
    system.shutdown();
}
