use std::{
    collections::VecDeque,
    error, fmt,
    sync::{
        mpsc::{self, Receiver, Sender, SyncSender},
        Arc,
    },
    thread,
};

/// A fixed set of worker threads fed from a bounded job queue.
///
/// A mux thread hands each queued payload to the next idle worker. Jobs are
/// independent; results travel back through whatever channel the job runner
/// captures.
pub struct ThreadPool<Payload: 'static + Send> {
    queue_tx: SyncSender<Signal<Payload>>,
    term_rx: Receiver<()>,
}

impl<Payload: 'static + Send> ThreadPool<Payload> {
    pub fn spawn<JobRunner>(size: usize, queue_size: usize, job_runner: JobRunner) -> ThreadPool<Payload>
    where
        JobRunner: Fn(Payload) + 'static + Send + Sync,
    {
        let (queue_tx, queue_rx) = mpsc::sync_channel(queue_size);
        let (term_tx, term_rx) = mpsc::channel();

        WorkerMux::spawn(size, job_runner, queue_rx, term_tx);

        ThreadPool { queue_tx, term_rx }
    }

    /// Blocks while the queue is full.
    pub fn enqueue(&self, payload: Payload) -> Result<(), PoolError> {
        self.queue_tx
            .send(Signal::Job(payload))
            .map_err(|_| PoolError::Disconnected)
    }

    /// Lets every queued job finish, then stops all workers.
    pub fn terminate_and_join(self) -> Result<(), PoolError> {
        self.queue_tx
            .send(Signal::Term)
            .map_err(|_| PoolError::Disconnected)?;
        self.term_rx.recv().map_err(|_| PoolError::Disconnected)
    }
}

struct WorkerMux;

impl WorkerMux {
    fn spawn<JobRunner, Payload: 'static + Send>(
        size: usize,
        job_runner: JobRunner,
        queue_rx: Receiver<Signal<Payload>>,
        term_tx: Sender<()>,
    ) where
        JobRunner: Fn(Payload) + 'static + Send + Sync,
    {
        let job_runner = Arc::new(job_runner);
        let (mux_tx, mux_rx) = mpsc::channel();

        let workers: Vec<Worker<Payload>> = (0..size)
            .map(|id| Worker::spawn(id, mux_tx.clone(), job_runner.clone()))
            .collect();

        thread::spawn(move || {
            let mut idle_workers: VecDeque<WorkerId> = VecDeque::new();

            loop {
                let id = match idle_workers.pop_front() {
                    Some(id) => id,
                    None => match mux_rx.recv() {
                        Ok(WorkerReport {
                            id,
                            status: WorkerStatus::Idle,
                        }) => {
                            idle_workers.push_back(id);
                            continue;
                        }
                        Ok(_) => continue,
                        Err(_) => {
                            error!("All thread pool workers disconnected");
                            break;
                        }
                    },
                };

                match queue_rx.recv() {
                    Ok(Signal::Job(payload)) => workers[id].run_job(payload),
                    Ok(Signal::Term) | Err(_) => break,
                }
            }

            for worker in &workers {
                worker.terminate();
            }

            let mut terminated_workers = 0;
            while terminated_workers < size {
                match mux_rx.recv() {
                    Ok(WorkerReport {
                        status: WorkerStatus::Term,
                        ..
                    }) => terminated_workers += 1,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }

            if term_tx.send(()).is_err() {
                debug!("Thread pool terminated after its owner was dropped");
            }
        });
    }
}

struct Worker<Payload: 'static + Send> {
    id: WorkerId,
    tx: Sender<Signal<Payload>>,
}

impl<Payload: 'static + Send> Worker<Payload> {
    fn spawn<JobRunner>(id: WorkerId, mux_tx: Sender<WorkerReport>, job_runner: Arc<JobRunner>) -> Worker<Payload>
    where
        JobRunner: Fn(Payload) + 'static + Send + Sync,
    {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            loop {
                let report = WorkerReport {
                    id,
                    status: WorkerStatus::Idle,
                };
                if mux_tx.send(report).is_err() {
                    return;
                }

                match rx.recv() {
                    Ok(Signal::Job(payload)) => job_runner(payload),
                    Ok(Signal::Term) | Err(_) => break,
                }
            }

            let report = WorkerReport {
                id,
                status: WorkerStatus::Term,
            };
            if mux_tx.send(report).is_err() {
                trace!("Worker {} stopped after its mux", id);
            }
        });

        Worker { id, tx }
    }

    fn run_job(&self, payload: Payload) {
        if self.tx.send(Signal::Job(payload)).is_err() {
            warn!("Dropped job for stopped worker {}", self.id);
        }
    }

    fn terminate(&self) {
        if self.tx.send(Signal::Term).is_err() {
            trace!("Worker {} already stopped", self.id);
        }
    }
}

enum Signal<Payload: 'static + Send> {
    Term,
    Job(Payload),
}

struct WorkerReport {
    id: WorkerId,
    status: WorkerStatus,
}

type WorkerId = usize;

enum WorkerStatus {
    Term,
    Idle,
}

#[derive(Debug, PartialEq)]
pub enum PoolError {
    Disconnected,
    LostJob(usize),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PoolError::Disconnected => write!(f, "Thread pool disconnected"),
            PoolError::LostJob(index) => write!(f, "Job {} produced no result", index),
        }
    }
}

impl error::Error for PoolError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn runs_every_job() {
        //setup
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let pool = ThreadPool::spawn(3, 2, move |n: usize| {
            tx.lock().unwrap().send(n * n).unwrap();
        });

        //exercise
        for n in 0..20 {
            pool.enqueue(n).unwrap();
        }
        pool.terminate_and_join().unwrap();

        //verify
        let mut res: Vec<usize> = rx.iter().collect();
        res.sort();
        assert_eq!(res, (0..20).map(|n| n * n).collect::<Vec<usize>>());
    }

    #[test]
    fn terminate_idle_pool() {
        //setup
        let pool: ThreadPool<()> = ThreadPool::spawn(2, 0, |_| {});

        //exercise
        let res = pool.terminate_and_join();

        //verify
        assert_eq!(res, Ok(()));
    }
}
