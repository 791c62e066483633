use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::game::{Session, TickClock, Transition};
use crate::input::InputController;
use crate::rendering::Renderer;
use log::{debug, error, info, warn};
use macroquad::prelude::*;
use shared::{decode, encode, Packet, CLIENT_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::time::{self as clock, sleep, sleep_until};

/// A packet held back until its simulated latency has passed.
type Delayed = (clock::Instant, Packet);

/// Datagram channel to the game server, driven by a small tokio runtime.
///
/// The frame loop never blocks on the network: outbound packets go into an
/// unbounded queue and are sent fire-and-forget, inbound packets are decoded on
/// the runtime and collected with [`Transport::try_recv`] between frames.
///
/// With a fake ping every packet is stamped with its own due time, half the
/// ping after it was queued or received, so a burst is shifted as a whole
/// instead of queueing up behind one sleep per packet.
pub struct Transport {
    runtime: Runtime,
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    one_way_delay: Duration,
    outbound: mpsc::UnboundedSender<Delayed>,
    inbound: mpsc::UnboundedReceiver<Packet>,
}

impl Transport {
    pub fn connect(server_addr: SocketAddr, fake_ping: Duration) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("snake-transport")
            .enable_all()
            .build()?;

        let std_socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
        std_socket.set_nonblocking(true)?;
        let socket = {
            let _guard = runtime.enter();
            Arc::new(UdpSocket::from_std(std_socket)?)
        };

        let one_way_delay = fake_ping / 2;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (delayed_tx, delayed_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        runtime.spawn(receive_loop(
            Arc::clone(&socket),
            server_addr,
            one_way_delay,
            delayed_tx,
        ));
        runtime.spawn(deliver_loop(delayed_rx, inbound_tx));
        runtime.spawn(send_loop(Arc::clone(&socket), server_addr, outbound_rx));

        Ok(Transport {
            runtime,
            socket,
            server_addr,
            one_way_delay,
            outbound,
            inbound,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.socket.local_addr()?)
    }

    /// Queues a packet. A closed queue only means the packet is lost.
    pub fn send(&self, packet: Packet) {
        let due = clock::Instant::now() + self.one_way_delay;
        if let Err(e) = self.outbound.send((due, packet)) {
            warn!("Dropping outbound packet: {}", e);
        }
    }

    pub fn try_recv(&mut self) -> Option<Packet> {
        self.inbound.try_recv().ok()
    }

    /// Tells the server we are leaving and stops the runtime.
    pub fn shutdown(self) {
        match encode(&Packet::Disconnect) {
            Ok(data) => {
                let sent = self.runtime.block_on(async {
                    tokio::time::timeout(
                        Duration::from_millis(100),
                        self.socket.send_to(&data, self.server_addr),
                    )
                    .await
                });
                if !matches!(sent, Ok(Ok(_))) {
                    debug!("Disconnect notice was not delivered");
                }
            }
            Err(e) => error!("Error encoding disconnect: {}", e),
        }

        self.runtime.shutdown_timeout(Duration::from_millis(100));
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    one_way_delay: Duration,
    delayed: mpsc::UnboundedSender<Delayed>,
) {
    let mut buffer = [0u8; 2048];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, addr)) => {
                if addr != server_addr {
                    debug!("Ignoring datagram from unknown peer {}", addr);
                    continue;
                }

                match decode(&buffer[..len]) {
                    Ok(packet) => {
                        let due = clock::Instant::now() + one_way_delay;
                        if delayed.send((due, packet)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Malformed packet from {}: {}", addr, e),
                }
            }
            Err(e) => {
                error!("Error receiving packet: {}", e);
                sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Hands received packets to the frame loop once they are due. Due times only
/// grow, so waiting in arrival order keeps both order and per-packet latency.
async fn deliver_loop(
    mut delayed: mpsc::UnboundedReceiver<Delayed>,
    inbound: mpsc::UnboundedSender<Packet>,
) {
    while let Some((due, packet)) = delayed.recv().await {
        sleep_until(due).await;
        if inbound.send(packet).is_err() {
            break;
        }
    }
}

async fn send_loop(
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    mut outbound: mpsc::UnboundedReceiver<Delayed>,
) {
    while let Some((due, packet)) = outbound.recv().await {
        sleep_until(due).await;

        let data = match encode(&packet) {
            Ok(data) => data,
            Err(e) => {
                error!("Error encoding packet: {}", e);
                continue;
            }
        };

        if let Err(e) = socket.send_to(&data, server_addr).await {
            warn!("Error sending packet: {}", e);
        }
    }
}

/// Owns the session and drives it once per rendered frame: apply whatever the
/// server pushed, read input, tick if the interval elapsed, then draw.
pub struct Client {
    config: ClientConfig,
    transport: Transport,
    session: Session,
    clock: TickClock,
    input: InputController,
    renderer: Renderer,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = Transport::connect(config.server_addr, config.fake_ping)?;
        let clock = TickClock::new(config.tick_interval);

        Ok(Client {
            config,
            transport,
            session: Session::new(),
            clock,
            input: InputController::new(),
            renderer: Renderer::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn connect(&self) {
        info!(
            "Connecting to {} as {:?}...",
            self.config.server_addr, self.config.nickname
        );
        self.transport.send(Packet::Connect {
            client_version: CLIENT_VERSION,
            nickname: self.config.nickname.clone(),
        });
    }

    /// Runs every queued server event to completion before the frame's tick.
    pub fn sync(&mut self) {
        while let Some(packet) = self.transport.try_recv() {
            match self.session.handle_packet(packet) {
                Ok(Transition::Disconnected { .. }) => {
                    info!("Waiting for the server to start a new session");
                }
                Ok(_) => {}
                Err(e) => warn!("Rejected server update: {}", e),
            }
        }
    }

    /// Advances the snake if the tick interval has elapsed and reports the new
    /// head to the server. Returns whether a tick ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.session.is_running() || !self.clock.poll(now) {
            return false;
        }

        match self.session.advance() {
            Some(event) => {
                self.transport.send(Packet::GameEvent(event));
                true
            }
            None => false,
        }
    }

    pub fn shutdown(self) {
        self.transport.shutdown();
    }

    pub async fn run(mut self) -> Result<(), ClientError> {
        prevent_quit();
        self.connect();

        loop {
            if is_quit_requested() {
                break;
            }

            self.sync();
            self.input.poll(&mut self.session);
            self.tick(Instant::now());
            self.renderer.render(&self.session);

            next_frame().await;
        }

        info!("Window closed, disconnecting");
        self.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{GameEvent, Position, StateSnapshot};

    fn recv_packet(socket: &std::net::UdpSocket) -> (Packet, SocketAddr) {
        let mut buffer = [0u8; 2048];
        let (len, addr) = socket.recv_from(&mut buffer).expect("no packet arrived");
        (decode(&buffer[..len]).expect("undecodable packet"), addr)
    }

    fn wait_for_packet(transport: &mut Transport) -> Packet {
        for _ in 0..200 {
            if let Some(packet) = transport.try_recv() {
                return packet;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("no packet delivered to the client");
    }

    fn server() -> (std::net::UdpSocket, SocketAddr) {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    #[test]
    fn test_transport_sends_and_receives() {
        let (server, server_addr) = server();
        let mut transport = Transport::connect(server_addr, Duration::ZERO).unwrap();

        transport.send(Packet::GameEvent(GameEvent::Move {
            head: Position::new(6, 5),
        }));
        let (packet, client_addr) = recv_packet(&server);
        assert!(matches!(
            packet,
            Packet::GameEvent(GameEvent::Move { head }) if head == Position::new(6, 5)
        ));

        let reply = encode(&Packet::AppleEaten {
            apple: Position::new(3, 4),
            score: 2,
        })
        .unwrap();
        server.send_to(&reply, client_addr).unwrap();

        match wait_for_packet(&mut transport) {
            Packet::AppleEaten { apple, score } => {
                assert_eq!(apple, Position::new(3, 4));
                assert_eq!(score, 2);
            }
            other => panic!("unexpected packet {:?}", other),
        }

        transport.shutdown();
        let (packet, _) = recv_packet(&server);
        assert!(matches!(packet, Packet::Disconnect));
    }

    #[test]
    fn test_transport_binds_its_own_port() {
        let (server, server_addr) = server();
        let transport = Transport::connect(server_addr, Duration::ZERO).unwrap();
        transport.send(Packet::Disconnect);

        let (_, client_addr) = recv_packet(&server);
        assert_eq!(transport.local_addr().unwrap().port(), client_addr.port());

        transport.shutdown();
    }

    #[test]
    fn test_fake_ping_delays_each_outbound_packet_once() {
        let (server, server_addr) = server();
        let transport = Transport::connect(server_addr, Duration::from_millis(200)).unwrap();

        let start = Instant::now();
        for x in 0..10 {
            transport.send(Packet::GameEvent(GameEvent::Move {
                head: Position::new(x, 0),
            }));
        }

        for x in 0..10 {
            let (packet, _) = recv_packet(&server);
            assert!(matches!(
                packet,
                Packet::GameEvent(GameEvent::Move { head }) if head == Position::new(x, 0)
            ));
        }
        let elapsed = start.elapsed();

        // every packet is due 100ms after it was queued, not 100ms after the previous one
        assert!(elapsed >= Duration::from_millis(95), "arrived early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "delay piled up: {:?}", elapsed);

        transport.shutdown();
    }

    #[test]
    fn test_fake_ping_delays_each_inbound_packet_once() {
        let (server, server_addr) = server();
        let mut transport = Transport::connect(server_addr, Duration::from_millis(200)).unwrap();
        transport.send(Packet::Disconnect);
        let (_, client_addr) = recv_packet(&server);

        let start = Instant::now();
        for score in 1..=10 {
            let data = encode(&Packet::AppleEaten {
                apple: Position::new(1, 1),
                score,
            })
            .unwrap();
            server.send_to(&data, client_addr).unwrap();
        }

        for expected in 1..=10 {
            match wait_for_packet(&mut transport) {
                Packet::AppleEaten { score, .. } => assert_eq!(score, expected),
                other => panic!("unexpected packet {:?}", other),
            }
        }
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(95), "arrived early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "delay piled up: {:?}", elapsed);

        transport.shutdown();
    }

    #[test]
    fn test_transport_skips_malformed_datagrams() {
        let (server, server_addr) = server();
        let mut transport = Transport::connect(server_addr, Duration::ZERO).unwrap();
        transport.send(Packet::Disconnect);
        let (_, client_addr) = recv_packet(&server);

        server.send_to(&[0xff, 0xff, 0xff, 0xff], client_addr).unwrap();
        let snapshot = StateSnapshot {
            nickname: "viper".to_string(),
            snake: vec![Position::new(5, 5)],
            direction: "RIGHT".to_string(),
            apple: Position::new(1, 1),
            score: 0,
            grid_size: (20, 20),
        };
        server
            .send_to(
                &encode(&Packet::InitialState(snapshot.clone())).unwrap(),
                client_addr,
            )
            .unwrap();

        match wait_for_packet(&mut transport) {
            Packet::InitialState(received) => assert_eq!(received, snapshot),
            other => panic!("unexpected packet {:?}", other),
        }

        transport.shutdown();
    }
}
