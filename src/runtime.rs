//! A tokio driver for [`Olsr`].

use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, trace};

use crate::{
    core::traits::{ProcessData, TopologyListener, Transport},
    olsr::{Olsr, Response},
};

/// Runs the periodic work of a protocol instance and sends what it produces through a
/// [`Transport`].
///
/// Three tasks are started: HELLO emission, TC emission and maintenance (expiry, recomputation,
/// grace decay and listener notification). They are aborted on [`Driver::shutdown`] or when the
/// driver is dropped.
#[cfg_attr(doc_cfg, doc(cfg(feature = "runtime")))]
pub struct Driver {
    olsr: Arc<Olsr>,
    transport: Arc<dyn Transport>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

fn interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl Driver {
    /// Starts the periodic tasks, must be called from within a tokio runtime.
    pub fn spawn(
        olsr: Arc<Olsr>,
        transport: Arc<dyn Transport>,
        listener: Arc<dyn TopologyListener>,
    ) -> Arc<Self> {
        let driver = Arc::new(Self {
            olsr,
            transport,
            tasks: Mutex::new(Vec::with_capacity(3)),
        });

        let config = driver.olsr.config();
        let (hello_interval, tc_interval, maintenance_interval) = (
            config.hello_interval,
            config.tc_interval,
            config.maintenance_interval,
        );

        // The tasks only hold what they use, the driver itself stays droppable.
        let hello = {
            let olsr = driver.olsr.clone();
            let transport = driver.transport.clone();
            tokio::spawn(async move {
                let mut interval = interval(hello_interval);
                loop {
                    interval.tick().await;
                    dispatch(&*transport, Response::Flood(olsr.generate_hello()));
                }
            })
        };

        let tc = {
            let olsr = driver.olsr.clone();
            let transport = driver.transport.clone();
            tokio::spawn(async move {
                let mut interval = interval(tc_interval);
                loop {
                    interval.tick().await;
                    dispatch(&*transport, Response::Flood(olsr.generate_tc()));
                }
            })
        };

        let maintenance = {
            let olsr = driver.olsr.clone();
            tokio::spawn(async move {
                let mut interval = interval(maintenance_interval);
                loop {
                    interval.tick().await;

                    let expired = olsr.sweep();
                    let recomputed = olsr.recompute();
                    olsr.tick_grace();

                    if recomputed {
                        trace!(expired, "topology changed");
                        listener.on_topology_information(olsr.topology_information());
                    }
                }
            })
        };

        driver.tasks.lock().extend([hello, tc, maintenance]);

        driver
    }

    pub fn olsr(&self) -> &Arc<Olsr> {
        &self.olsr
    }

    /// Processes a control packet received from `from`.
    pub fn inbound(&self, bytes: &[u8], from: Ipv4Addr) {
        if let Some(response) = self.olsr.process_packet(bytes, from) {
            self.dispatch(response);
        }
    }

    /// Processes a data message received from `from`.
    pub fn inbound_data<S: Clone, T: ProcessData<S>>(
        &self,
        state: S,
        bytes: &[u8],
        from: Ipv4Addr,
    ) {
        if let Some(response) = self.olsr.process_data::<S, T>(state, bytes, from) {
            self.dispatch(response);
        }
    }

    /// Sends a payload to a multicast group.
    pub fn send_multicast(&self, group: Ipv4Addr, payload: Bytes) {
        let response = self.olsr.send_multicast(group, payload);
        self.dispatch(response);
    }

    /// Encodes and sends the messages making up a response.
    pub fn dispatch(&self, response: Response) {
        dispatch(&*self.transport, response)
    }

    /// Stops the periodic tasks.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

fn dispatch(transport: &dyn Transport, response: Response) {
    match response {
        Response::Flood(packet) => match packet.encode() {
            Ok(bytes) => transport.send_to_neighbors(bytes),
            Err(e) => debug!(error = %e, "failed to encode control packet"),
        },
        Response::Multicast(copies) => {
            for (to, message) in copies {
                match message.encode() {
                    Ok(bytes) => transport.send(to, bytes),
                    Err(e) => debug!(%to, error = %e, "failed to encode data message"),
                }
            }
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
