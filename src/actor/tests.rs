use crate as chanplex;

use anyhow::Result;
use chanplex::{prelude::*, tests::init_tracing, Error, SendError};
use parking_lot::Mutex;
use std::{
    sync::{mpsc, Arc},
    thread,
    time::{Duration, SystemTime},
};

const CENTI_SECOND: Duration = Duration::from_millis(10);
const DECI_SECOND: Duration = Duration::from_millis(100);

#[test]
fn logger_dispatches_by_type() -> Result<()> {
    init_tracing();
    let (report, reports) = mpsc::channel();
    let logger = ActorBuilder::new()
        .name("logger")
        .spawn(move |receiver: Receiver<Message>| {
            for mut msg in &receiver {
                msg.on::<String>(|s| report.send(format!("LOG(str): {s}")).unwrap())
                    .on::<&str>(|s| report.send(format!("LOG(cstr): {s}")).unwrap())
                    .on::<i32>(|n| report.send(format!("LOG(num): {n}")).unwrap())
                    .on::<f32>(|x| report.send(format!("LOG(float): {x}")).unwrap())
                    .on::<bool>(|b| report.send(format!("LOG(bool): {b}")).unwrap())
                    .otherwise(|| report.send("LOG(?): Unhandled!".to_owned()).unwrap());
            }
        })?;

    _ = &logger
        << Message::new(String::from("Hello, World"))
        << Message::new("Hello, World")
        << Message::new(42)
        << Message::new(true)
        << Message::new(2.81)
        << Message::new(1.5_f32);
    logger.stop()?;

    assert_eq!(
        reports.iter().collect::<Vec<_>>(),
        [
            "LOG(str): Hello, World",
            "LOG(cstr): Hello, World",
            "LOG(num): 42",
            "LOG(bool): true",
            "LOG(?): Unhandled!",
            "LOG(float): 1.5",
        ]
    );
    Ok(())
}

#[test]
fn handler_sees_backlog_sent_before_stop() -> Result<()> {
    let (report, reports) = mpsc::channel();
    let actor = Actor::spawn(move |receiver: Receiver<usize>| {
        // Let the backlog pile up, including past the stop request.
        thread::sleep(DECI_SECOND);
        for n in &receiver {
            report.send(n).unwrap();
        }
    })?;
    for n in 0..100 {
        actor.send(n)?;
    }
    assert!(!actor.is_killing());
    actor.stop()?;
    assert_eq!(reports.iter().collect::<Vec<_>>(), (0..100).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn stopped_actor_rejects_messages() -> Result<()> {
    let actor = Actor::spawn(|receiver: Receiver<u8>| for _ in &receiver {})?;
    let address = actor.address();
    address.send(1)?;
    drop(actor);

    assert!(address.is_killing());
    assert_eq!(address.send(2).unwrap_err().into_inner(), 2);
    Ok(())
}

#[test]
fn actors_forward_along_a_chain() -> Result<()> {
    let (report, reports) = mpsc::channel();
    let a = Actor::spawn(move |receiver: Receiver<i32>| {
        while let Some(x) = receiver.receive() {
            report.send(x).unwrap();
        }
    })?;
    let to_a = a.address();
    let b = Actor::spawn(move |receiver: Receiver<i32>| {
        for x in receiver {
            to_a.send(x * 10).unwrap();
        }
    })?;

    for i in 1..10 {
        b.send(i)?;
        thread::sleep(CENTI_SECOND);
    }
    b.stop()?;
    a.stop()?;
    assert_eq!(
        reports.iter().collect::<Vec<_>>(),
        [10, 20, 30, 40, 50, 60, 70, 80, 90]
    );
    Ok(())
}

#[derive(Debug)]
struct TimeRequest;

#[test]
fn call_returns_the_reply() -> Result<()> {
    let server = Actor::spawn(|receiver: Receiver<Message>| {
        for mut msg in &receiver {
            msg.on::<Call<TimeRequest, SystemTime>>(|call| {
                _ = call.reply(SystemTime::now());
            });
        }
    })?;
    let before = SystemTime::now();
    let now: SystemTime = server.call(TimeRequest)?;
    assert!(now >= before);

    let address = server.address();
    let later: SystemTime = address.call(TimeRequest)?;
    assert!(later >= now);
    Ok(())
}

#[derive(Debug)]
enum CounterMsg {
    Increment,
    Get(Call<(), u64>),
}

impl From<Call<(), u64>> for CounterMsg {
    fn from(call: Call<(), u64>) -> Self {
        Self::Get(call)
    }
}

#[test]
fn typed_actor_answers_calls() -> Result<()> {
    let counter = Actor::spawn(|receiver: Receiver<CounterMsg>| {
        let mut count = 0;
        for msg in &receiver {
            match msg {
                CounterMsg::Increment => count += 1,
                CounterMsg::Get(call) => {
                    _ = call.reply(count);
                }
            }
        }
    })?;
    for _ in 0..3 {
        counter.send(CounterMsg::Increment)?;
    }
    let count: u64 = counter.call(())?;
    assert_eq!(count, 3);
    Ok(())
}

#[test]
fn call_fails_when_the_request_is_dropped() -> Result<()> {
    let ignorer = Actor::spawn(|receiver: Receiver<Message>| for _ in &receiver {})?;
    let reply: Result<u8> = ignorer.call(TimeRequest);
    assert!(reply.is_err());

    let address = ignorer.address();
    ignorer.stop()?;
    let reply: Result<u8> = address.call(TimeRequest);
    assert!(reply.is_err());
    Ok(())
}

#[test]
fn handler_can_message_itself() -> Result<()> {
    let (report, reports) = mpsc::channel();
    let countdown = Actor::spawn(move |receiver: Receiver<u32>| {
        let myself = receiver.address();
        for n in &receiver {
            report.send(n).unwrap();
            if n > 0 {
                _ = myself.send(n - 1);
            } else {
                break;
            }
        }
    })?;
    countdown.send(3)?;
    let mut seen = Vec::new();
    while seen.last() != Some(&0) {
        seen.push(reports.recv_timeout(DECI_SECOND * 10)?);
    }
    assert_eq!(seen, [3, 2, 1, 0]);
    countdown.stop()?;
    Ok(())
}

#[test]
fn worker_thread_is_named() -> Result<()> {
    let (report, reports) = mpsc::channel();
    let named = ActorBuilder::new().name("worker").spawn(move |_: Receiver<()>| {
        report
            .send(thread::current().name().map(str::to_owned))
            .unwrap();
    })?;
    assert_eq!(named.name(), "worker");
    assert_eq!(reports.recv()?, Some("worker".to_owned()));

    let unnamed = Actor::spawn(|_: Receiver<()>| {})?;
    assert!(unnamed.name().starts_with("actor-"));
    Ok(())
}

#[test]
fn stop_reports_a_panicked_handler() -> Result<()> {
    let actor = Actor::spawn(|receiver: Receiver<u8>| {
        if receiver.receive() == Some(0) {
            panic!("division by zero");
        }
    })?;
    actor.send(0)?;
    let err = actor.stop().unwrap_err();
    assert!(matches!(err, Error::ActorPanicked { ref name } if name.starts_with("actor-")));
    Ok(())
}

#[test]
fn receiver_observes_killing() -> Result<()> {
    let (report, reports) = mpsc::channel();
    let actor = Actor::spawn(move |receiver: Receiver<u8>| {
        while receiver.receive().is_some() {}
        report.send(receiver.is_killing()).unwrap();
        report.send(receiver.try_receive().is_none()).unwrap();
    })?;
    actor.stop()?;
    assert_eq!(reports.iter().collect::<Vec<_>>(), [true, true]);
    Ok(())
}

fn send_late(address: &Address<Message>) -> Result<()> {
    address.send(Message::new("late"))?;
    Ok(())
}

#[test]
fn rejected_message_propagates_as_anyhow_error() -> Result<()> {
    let actor = Actor::spawn(|receiver: Receiver<Message>| for _ in &receiver {})?;
    let address = actor.address();
    actor.stop()?;

    let err = send_late(&address).unwrap_err();
    let rejected = err.downcast_ref::<SendError<Message>>();
    assert!(rejected.is_some_and(|SendError(msg)| msg.is::<&str>()));
    Ok(())
}

#[test]
fn call_fails_after_the_handler_returned() -> Result<()> {
    let (report, reports) = mpsc::channel();
    let short_lived = Actor::spawn(move |receiver: Receiver<Message>| {
        _ = receiver.receive();
        report.send(()).unwrap();
    })?;
    short_lived.send(Message::new("only one"))?;
    let reply: Result<SystemTime> = short_lived.call(TimeRequest);
    assert!(reply.is_err());

    reports.recv_timeout(DECI_SECOND * 10)?;
    assert!(short_lived.is_killing());
    assert!(short_lived.send(Message::new("ignored")).is_err());
    short_lived.stop()?;
    Ok(())
}

#[test]
fn call_fails_after_the_handler_panicked() -> Result<()> {
    let doomed = Actor::spawn(|receiver: Receiver<Message>| {
        for mut msg in &receiver {
            msg.on::<u8>(|_| panic!("cannot handle bytes"));
        }
    })?;
    doomed.send(Message::new(0_u8))?;
    let reply: Result<SystemTime> = doomed.call(TimeRequest);
    assert!(reply.is_err());
    assert!(matches!(doomed.stop(), Err(Error::ActorPanicked { .. })));
    Ok(())
}

#[test]
fn last_handle_dropped_on_its_own_worker() -> Result<()> {
    let (report, reports) = mpsc::channel();
    let slot: Arc<Mutex<Option<Actor<()>>>> = Arc::default();
    let actor = {
        let slot = Arc::clone(&slot);
        Actor::spawn(move |receiver: Receiver<()>| {
            for () in &receiver {
                let myself = slot.lock().take();
                drop(myself);
                report.send(receiver.is_killing()).unwrap();
            }
        })?
    };
    let address = actor.address();
    *slot.lock() = Some(actor);
    address.send(())?;

    assert!(reports.recv_timeout(DECI_SECOND * 10)?);
    assert!(address.is_killing());
    Ok(())
}
