use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future;
use solver::Algorithm;
use tokio::{sync::watch, time};

use recon_server::admission::{AdmissionController, CostTable, ResourceId, Snapshot};

const CPU_CAP: f32 = 100.;
const WAIT: Duration = Duration::from_secs(5);
const SHORT: Duration = Duration::from_millis(100);

fn controller(cpu: f32) -> (Arc<AdmissionController>, watch::Sender<f32>) {
    let (tx, rx) = watch::channel(cpu);
    let controller = AdmissionController::new(CostTable::uniform(20.), CPU_CAP, rx);
    (Arc::new(controller), tx)
}

fn id(model: &str, algorithm: Algorithm) -> ResourceId {
    ResourceId::new(model, algorithm)
}

#[tokio::test(flavor = "multi_thread")]
async fn same_resource_is_mutually_exclusive() {
    const REQUESTS: usize = 8;

    let (controller, _tx) = controller(0.);
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let tasks = (0..REQUESTS).map(|_| {
        let controller = Arc::clone(&controller);
        let inside = Arc::clone(&inside);
        let max_inside = Arc::clone(&max_inside);

        tokio::spawn(async move {
            let _permit = controller.acquire(id("H_30x30.csv", Algorithm::Cgnr)).await;

            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
            max_inside.fetch_max(now, Ordering::SeqCst);
            time::sleep(Duration::from_millis(10)).await;
            inside.fetch_sub(1, Ordering::SeqCst);
        })
    });

    for res in future::join_all(tasks).await {
        res.unwrap();
    }

    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(controller.snapshot(), Snapshot::default());
}

#[tokio::test(flavor = "multi_thread")]
async fn distinct_resources_run_concurrently() {
    let (controller, _tx) = controller(0.);

    let _cgne = controller.acquire(id("H_30x30.csv", Algorithm::Cgne)).await;
    let _cgnr = time::timeout(WAIT, controller.acquire(id("H_30x30.csv", Algorithm::Cgnr)))
        .await
        .unwrap();
    let _other = time::timeout(WAIT, controller.acquire(id("H_60x60.csv", Algorithm::Cgne)))
        .await
        .unwrap();

    assert_eq!(
        controller.snapshot(),
        Snapshot {
            active: 3,
            waiting: 0
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn saturated_cpu_holds_back_until_a_new_sample() {
    let (controller, tx) = controller(200.);

    // Nothing else is running, so even a saturated CPU admits.
    let first = controller.acquire(id("a", Algorithm::Cgne)).await;

    let mut waiter = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.acquire(id("b", Algorithm::Cgne)).await })
    };

    assert!(time::timeout(SHORT, &mut waiter).await.is_err());
    assert_eq!(
        controller.snapshot(),
        Snapshot {
            active: 1,
            waiting: 1
        }
    );

    // Still over the cap.
    tx.send(115.).unwrap();
    assert!(time::timeout(SHORT, &mut waiter).await.is_err());

    tx.send(50.).unwrap();
    let second = time::timeout(WAIT, &mut waiter).await.unwrap().unwrap();

    assert_eq!(
        controller.snapshot(),
        Snapshot {
            active: 2,
            waiting: 0
        }
    );

    drop(first);
    drop(second);
    assert_eq!(controller.snapshot(), Snapshot::default());
}

#[tokio::test(flavor = "multi_thread")]
async fn release_wakes_a_waiter() {
    let (controller, _tx) = controller(500.);

    let first = controller.acquire(id("a", Algorithm::Cgne)).await;
    let mut waiter = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.acquire(id("b", Algorithm::Cgnr)).await })
    };

    assert!(time::timeout(SHORT, &mut waiter).await.is_err());

    drop(first);
    let second = time::timeout(WAIT, &mut waiter).await.unwrap().unwrap();
    assert_eq!(second.id(), &id("b", Algorithm::Cgnr));
    assert_eq!(
        controller.snapshot(),
        Snapshot {
            active: 1,
            waiting: 0
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn release_wakes_a_waiter_without_a_sampler() {
    let (controller, tx) = controller(500.);
    drop(tx);

    let first = controller.acquire(id("a", Algorithm::Cgne)).await;
    let mut waiter = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.acquire(id("b", Algorithm::Cgne)).await })
    };

    assert!(time::timeout(SHORT, &mut waiter).await.is_err());

    drop(first);
    time::timeout(WAIT, &mut waiter).await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn waiting_for_the_resource_lock_counts_as_waiting() {
    let (controller, _tx) = controller(0.);

    let first = controller.acquire(id("a", Algorithm::Cgne)).await;
    let mut waiter = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.acquire(id("a", Algorithm::Cgne)).await })
    };

    assert!(time::timeout(SHORT, &mut waiter).await.is_err());
    assert_eq!(controller.snapshot().waiting, 1);

    drop(first);
    let _second = time::timeout(WAIT, &mut waiter).await.unwrap().unwrap();
    assert_eq!(
        controller.snapshot(),
        Snapshot {
            active: 1,
            waiting: 0
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn abandoned_waiters_are_forgotten() {
    let (controller, _tx) = controller(500.);

    let _first = controller.acquire(id("a", Algorithm::Cgne)).await;
    let waiter = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.acquire(id("b", Algorithm::Cgne)).await })
    };

    time::sleep(SHORT).await;
    assert_eq!(controller.snapshot().waiting, 1);

    waiter.abort();
    assert!(waiter.await.unwrap_err().is_cancelled());
    assert_eq!(
        controller.snapshot(),
        Snapshot {
            active: 1,
            waiting: 0
        }
    );
}
