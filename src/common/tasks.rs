// src/common/tasks.rs

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use tokio::{
    task::{JoinError, JoinSet},
    time::Instant,
};

/// Conjunto supervisionado de tarefas em segundo plano.
///
/// Substitui o "dispara e esquece": toda tarefa nasce aqui, falhas (panic)
/// são logadas num único lugar e o processo consegue esperar o trabalho
/// pendente no desligamento.
///
/// Há duas portas de entrada. `spawn` recebe trabalho novo vindo de fora
/// (um webhook) e fecha assim que o desligamento começa. `spawn_child`
/// recebe trabalho que uma tarefa em andamento precisa agendar (o
/// agendamento de um turno) e continua aberta enquanto o supervisor drena.
#[derive(Clone, Default)]
pub struct TaskSupervisor {
    inner: Arc<SupervisorInner>,
}

#[derive(Default)]
struct SupervisorInner {
    tasks: Mutex<JoinSet<()>>,
    // Não aceita mais trabalho externo
    closed: AtomicBool,
    // Não aceita mais nada (drenagem terminou ou estourou o prazo)
    stopped: AtomicBool,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agenda trabalho externo. Retorna `false` se o desligamento já começou.
    pub fn spawn<F>(&self, name: &'static str, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.inner.closed.load(Ordering::Acquire) {
            tracing::warn!(task = name, "Supervisor encerrando, tarefa descartada");
            return false;
        }
        self.push(name, fut)
    }

    /// Agenda trabalho derivado de uma tarefa em andamento. Continua aceito
    /// durante a drenagem; só retorna `false` depois que ela termina, e aí
    /// quem chamou deve executar o trabalho na hora.
    pub fn spawn_child<F>(&self, name: &'static str, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.push(name, fut)
    }

    fn push<F>(&self, name: &'static str, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();

        // Conferido com o lock na mão para não cair num conjunto já drenado
        if self.inner.stopped.load(Ordering::Acquire) {
            tracing::warn!(task = name, "Supervisor encerrado, tarefa recusada");
            return false;
        }

        // Colhe as que já terminaram para o JoinSet não crescer sem limite
        reap(&mut tasks);

        tasks.spawn(async move {
            fut.await;
            tracing::debug!(task = name, "Tarefa concluída");
        });
        true
    }

    /// Tarefas ainda em execução.
    pub fn pending(&self) -> usize {
        let mut tasks = self.lock();
        reap(&mut tasks);
        tasks.len()
    }

    /// Fecha a porta externa e espera as pendentes até `grace`, incluindo
    /// as filhas que elas agendarem no caminho. O que sobrar depois do
    /// prazo é abortado.
    pub async fn shutdown(&self, grace: Duration) {
        self.inner.closed.store(true, Ordering::Release);
        let deadline = Instant::now() + grace;

        loop {
            let mut tasks = {
                let mut guard = self.lock();
                // Vazio com o lock na mão: nenhuma filha pode mais entrar
                if guard.is_empty() {
                    self.inner.stopped.store(true, Ordering::Release);
                    return;
                }
                std::mem::take(&mut *guard)
            };

            tracing::info!("⏳ Aguardando {} tarefa(s) pendente(s)", tasks.len());

            let drain = async {
                while let Some(done) = tasks.join_next().await {
                    log_outcome(done);
                }
            };

            if tokio::time::timeout_at(deadline, drain).await.is_err() {
                tracing::warn!("Prazo de desligamento esgotado, abortando tarefas restantes");
                tasks.abort_all();
                let mut guard = self.lock();
                self.inner.stopped.store(true, Ordering::Release);
                guard.abort_all();
                return;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        match self.inner.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn reap(tasks: &mut JoinSet<()>) {
    while let Some(done) = tasks.try_join_next() {
        log_outcome(done);
    }
}

fn log_outcome(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("🔥 Tarefa em segundo plano entrou em pânico: {}", e);
        } else if e.is_cancelled() {
            tracing::debug!("Tarefa cancelada");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn shutdown_waits_for_pending_work() {
        let supervisor = TaskSupervisor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = counter.clone();
            supervisor.spawn("incrementa", async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        supervisor.shutdown(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn panicking_task_does_not_poison_supervisor() {
        let supervisor = TaskSupervisor::new();
        supervisor.spawn("explode", async { panic!("boom") });
        tokio::task::yield_now().await;

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        assert!(supervisor.spawn("segue", async move {
            flag.store(true, Ordering::SeqCst);
        }));

        supervisor.shutdown(Duration::from_secs(1)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn children_spawned_while_draining_are_awaited() {
        let supervisor = TaskSupervisor::new();
        let done = Arc::new(AtomicBool::new(false));

        let inner = supervisor.clone();
        let flag = done.clone();
        supervisor.spawn("pai", async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            // O desligamento já começou; a porta externa está fechada
            assert!(!inner.spawn("externa", async {}));
            assert!(inner.spawn_child("filha", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
            }));
        });

        supervisor.shutdown(Duration::from_secs(2)).await;
        assert!(done.load(Ordering::SeqCst));
        assert!(!supervisor.spawn_child("tarde", async {}));
    }

    #[tokio::test]
    async fn pending_ignores_finished_tasks() {
        let supervisor = TaskSupervisor::new();
        supervisor.spawn("rapida", async {});
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(supervisor.pending(), 0);

        supervisor.spawn("lenta", std::future::pending());
        assert_eq!(supervisor.pending(), 1);
        supervisor.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn rejects_work_after_shutdown() {
        let supervisor = TaskSupervisor::new();
        supervisor.shutdown(Duration::from_millis(10)).await;
        assert!(!supervisor.spawn("tarde", async {}));
        assert_eq!(supervisor.pending(), 0);
    }
}
